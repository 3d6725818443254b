use postline::models::FeedMode;
use postline::RunOptions;

enum Action {
    Exit,
    Run(RunOptions),
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let options = match handle_cli_flags() {
        Ok(Action::Exit) => return,
        Ok(Action::Run(options)) => options,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(2);
        }
    };

    if let Err(err) = postline::run(options) {
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
}

fn handle_cli_flags() -> anyhow::Result<Action> {
    let mut options = RunOptions::default();
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("postline {}", postline::VERSION);
                return Ok(Action::Exit);
            }
            "--help" | "-h" => {
                println!(
                    "postline - headless client for the post feed API.\n\n  --feed <mode>        Print one page of latest|following|recommended\n  --version, -V        Show version and exit\n  --help,    -h        Show this help message\n\nConfig: ~/.config/postline/config.yaml, POSTLINE_<SECTION>__<KEY> overrides.\nLogging: RUST_LOG=debug"
                );
                return Ok(Action::Exit);
            }
            "--feed" => {
                let value = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--feed needs a mode"))?;
                let mode = FeedMode::from_key(&value)
                    .ok_or_else(|| anyhow::anyhow!("unknown feed mode: {value}"))?;
                options.mode = Some(mode);
            }
            other => anyhow::bail!("unrecognized argument: {other}"),
        }
    }
    Ok(Action::Run(options))
}
