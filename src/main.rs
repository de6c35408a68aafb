use clap::Parser;
use snapsync::config::Args;
use snapsync::endpoint;
use snapsync::protocol::PROTOCOL_VERSION;
use snapsync::scanner::{self, Blake3Hasher, Cache, Entry, SymlinkMode};
use snapsync::server::EndpointServer;
use snapsync::url::{Protocol, Url};
use std::path::Path;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose {
        Level::DEBUG
    } else if args.quiet {
        Level::ERROR
    } else {
        Level::INFO
    };

    // Stdout carries the endpoint protocol in agent mode, so logs go to
    // stderr unconditionally.
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("setting default subscriber failed");

    if args.endpoint {
        info!("starting endpoint mode");
        let mut server = EndpointServer::new();
        if let Err(e) = server.run_stdio() {
            error!("endpoint error: {}", e);
            std::process::exit(1);
        }
        return Ok(());
    }

    let raw = args.root.as_deref().expect("root required in snapshot mode");
    let result = Url::parse(raw).and_then(|url| match url.protocol {
        Protocol::Local => snapshot_local(&args, &url),
        Protocol::Ssh => snapshot_remote(&args, &url),
        Protocol::Custom => Err(snapsync::SnapSyncError::InvalidUrl {
            url: raw.to_owned(),
            reason: format!("unknown protocol: {}", url.protocol),
        }),
    });

    if let Err(e) = result {
        error!("snapshot failed: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

fn snapshot_local(args: &Args, url: &Url) -> snapsync::Result<()> {
    let symlink_mode: SymlinkMode = args.symlink_mode.parse()?;

    let previous = match &args.cache {
        Some(path) if path.exists() => Some(Cache::load(path)?),
        _ => None,
    };

    info!(root = %url.path, "scanning");
    let mut hasher = Blake3Hasher::new();
    let (root, cache) = scanner::scan(
        Path::new(&url.path),
        &mut hasher,
        previous.as_ref(),
        &args.ignores,
        symlink_mode,
        args.max_file_size,
    )?;
    report(root.as_ref());

    if let Some(path) = &args.cache {
        cache.save(path)?;
        info!(entries = cache.len(), cache = %path.display(), "digest cache saved");
    }

    Ok(())
}

fn snapshot_remote(args: &Args, url: &Url) -> snapsync::Result<()> {
    let session = format!("cli-{}", std::process::id());
    info!(remote = %url, "connecting");
    let mut endpoint = endpoint::connect(&session, PROTOCOL_VERSION, url, &args.ignores, true)?;

    let root = endpoint.scan();
    let closed = endpoint.close();
    report(root?.as_ref());
    closed?;

    Ok(())
}

fn report(root: Option<&Entry>) {
    match root {
        None => info!("root does not exist; snapshot is empty"),
        Some(entry) => {
            let (files, directories, symlinks) = entry.count();
            info!(files, directories, symlinks, "snapshot complete");
        }
    }
}
