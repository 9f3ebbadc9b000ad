// gntp-send: register with a Growl-compatible daemon and send one notification.

use anyhow::{bail, Context};
use gntp_client::{config, Client, NotificationType, NotifyOptions, Resource};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const NOTIFICATION_NAME: &str = "notification";
const USAGE: &str =
    "usage: gntp-send [--version] [--sticky] [--priority N] [--icon PATH] <title> <text>";

#[derive(Debug, Default, PartialEq)]
struct Args {
    version: bool,
    sticky: bool,
    priority: i32,
    icon: Option<String>,
    title: String,
    text: String,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> anyhow::Result<Args> {
    let mut out = Args::default();
    let mut positional = Vec::new();
    let mut it = args.into_iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--version" | "-V" => out.version = true,
            "--sticky" => out.sticky = true,
            "--priority" => {
                let v = it.next().context("--priority needs a value")?;
                out.priority = v.parse().with_context(|| format!("bad priority: {v}"))?;
            }
            "--icon" => out.icon = Some(it.next().context("--icon needs a path")?),
            _ => positional.push(arg),
        }
    }
    if out.version {
        return Ok(out);
    }
    match <[String; 2]>::try_from(positional) {
        Ok([title, text]) => {
            out.title = title;
            out.text = text;
        }
        Err(_) => bail!(USAGE),
    }
    Ok(out)
}

fn main() -> anyhow::Result<()> {
    let args = parse_args(std::env::args().skip(1))?;
    if args.version {
        println!("gntp-send {}", VERSION);
        return Ok(());
    }

    let cfg = config::load();
    let level = if cfg.debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let icon = match &args.icon {
        Some(path) => Some(Resource::load(path)?),
        None => None,
    };
    let notification = NotificationType {
        icon: icon.clone(),
        ..NotificationType::new(NOTIFICATION_NAME)
    };
    let options = NotifyOptions::default()
        .with_sticky(args.sticky)
        .with_icon(icon)
        .with_priority(args.priority);

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let client = Client::new(cfg);
        client.register(&[notification]).await?;
        client
            .notify_with_options(NOTIFICATION_NAME, &args.title, &args.text, &options)
            .await?;
        log::info!("notification sent");
        anyhow::Ok(())
    })
}
