//! rad-acct: send one RADIUS accounting packet, driven by a dictionary.

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context};
use clap::{ArgAction, CommandFactory, Parser};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rad_acct::assembler::build_avps;
use rad_acct::config::{Action, Config, PartialConfig};
use rad_acct::dictionary::Dictionary;
use rad_acct::message::{Message, PacketCode};
use rad_acct::transport;
use rad_acct::types::supported_types;

/// Send a RADIUS accounting packet.
///
/// One of -S/-T/-I/-R selects the action; if more than one is given, the
/// last one present on the command line wins (matches the historical
/// getopt-based CLI this tool descends from).
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// RADIUS accounting server address
    #[arg(short = 'd', long = "dest")]
    dest: Option<String>,

    /// RADIUS accounting port
    #[arg(short = 'P', long = "port")]
    port: Option<u16>,

    /// Shared secret
    #[arg(short = 'p', long = "secret")]
    secret: Option<String>,

    /// Send Acct-Status-Type = Start
    #[arg(short = 'S', long = "start", action = ArgAction::SetTrue)]
    start: bool,

    /// Send Acct-Status-Type = Stop
    #[arg(short = 'T', long = "stop", action = ArgAction::SetTrue)]
    stop: bool,

    /// Send Acct-Status-Type = Interim-Update
    #[arg(short = 'I', long = "interim", action = ArgAction::SetTrue)]
    interim: bool,

    /// Send Stop, sleep for --delay seconds, then send Start
    #[arg(short = 'R', long = "restart", action = ArgAction::SetTrue)]
    restart: bool,

    /// User-Name
    #[arg(short = 'u', long = "username")]
    username: Option<String>,

    /// 3GPP-IMSI
    #[arg(short = 'i', long = "imsi")]
    imsi: Option<String>,

    /// 3GPP-IMEISV
    #[arg(short = 't', long = "imei")]
    imei: Option<String>,

    /// Framed-IP-Address or Framed-IPv6-Prefix, e.g. 10.0.0.1 or 10.0.0.1/24
    #[arg(short = 'f', long = "framed-ip")]
    framed_ip: Option<String>,

    /// Calling-Station-Id
    #[arg(short = 'c', long = "calling-id")]
    calling_id: Option<String>,

    /// Called-Station-Id
    #[arg(short = 'C', long = "called-id")]
    called_id: Option<String>,

    /// Extra attribute, name=value, may be given multiple times
    #[arg(short = 'a', long = "avp")]
    avp: Vec<String>,

    /// Seconds to sleep between Stop and Start when --restart is given
    #[arg(short = 'D', long = "delay")]
    delay: Option<u64>,

    /// Directory containing the dictionary file
    #[arg(long = "dict-path")]
    dict_path: Option<PathBuf>,

    /// Dictionary file name
    #[arg(long = "dict-fname")]
    dict_fname: Option<String>,

    /// Do not load or save the persisted config cache
    #[arg(short = 'L', long = "clean", action = ArgAction::SetTrue)]
    clean: bool,

    /// Raise logging verbosity to debug
    #[arg(short = 'v', long = "verbose", action = ArgAction::SetTrue)]
    verbose: bool,
}

/// Resolve the mutually exclusive action flags by "last one present in
/// argv order wins", matching the getopt loop this CLI descends from --
/// `clap`'s declarative parsing alone only tells us which flags were set,
/// not in what order, so argv indices are consulted directly.
fn resolve_action(_args: &Args) -> anyhow::Result<Option<Action>> {
    let matches = Args::command().get_matches();
    let flags: [(&str, Action); 4] = [
        ("start", Action::Start),
        ("stop", Action::Stop),
        ("interim", Action::Interim),
        ("restart", Action::Restart),
    ];
    let mut chosen: Option<(usize, Action)> = None;
    for (name, action) in flags {
        let is_set = matches
            .try_get_one::<bool>(name)
            .ok()
            .flatten()
            .copied()
            .unwrap_or(false);
        if !is_set {
            continue;
        }
        if let Some(idx) = matches.index_of(name) {
            if chosen.map_or(true, |(best, _)| idx > best) {
                chosen = Some((idx, action));
            }
        }
    }
    Ok(chosen.map(|(_, action)| action))
}

/// Split a `-f/--framed-ip` argument of the form `A` or `A/M` into the
/// address and an optional mask/prefix length.
fn parse_framed_ip(literal: &str) -> anyhow::Result<(String, Option<u8>)> {
    match literal.split_once('/') {
        Some((addr, mask)) => {
            let mask: u8 = mask
                .parse()
                .map_err(|_| anyhow!("--framed-ip mask {mask:?} must be a small integer"))?;
            Ok((addr.to_string(), Some(mask)))
        }
        None => Ok((literal.to_string(), None)),
    }
}

fn parse_avp(literal: &str) -> anyhow::Result<(String, String)> {
    literal
        .split_once('=')
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .ok_or_else(|| anyhow!("--avp value {literal:?} must be name=value"))
}

fn cache_path() -> PathBuf {
    PathBuf::from(".rad-acct.toml")
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = if args.verbose {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let action = resolve_action(&args)?
        .ok_or_else(|| anyhow!("one of -S/-T/-I/-R is required"))?;

    let mut avps = Vec::new();
    for literal in &args.avp {
        avps.push(parse_avp(literal)?);
    }

    let (framed_ip, framed_mask) = match &args.framed_ip {
        Some(literal) => {
            let (addr, mask) = parse_framed_ip(literal)?;
            (Some(addr), mask)
        }
        None => (None, None),
    };

    let overlay = PartialConfig {
        radius_dest: args.dest.clone(),
        radius_port: args.port,
        radius_secret: args.secret.clone(),
        action: Some(action),
        username: args.username.clone(),
        imsi: args.imsi.clone(),
        imei: args.imei.clone(),
        framed_ip,
        framed_mask,
        calling_id: args.calling_id.clone(),
        called_id: args.called_id.clone(),
        subs_loc_info: None,
        delay: args.delay,
        avps,
        dict_path: args.dict_path.clone(),
        dict_fname: args.dict_fname.clone(),
    };

    let base = if args.clean {
        None
    } else {
        Config::load_cache(cache_path()).context("loading persisted config cache")?
    };
    let cfg = Config::merge(base, overlay).context("resolving configuration")?;

    tracing::debug!(supported_types = ?supported_types(), "wire types available");

    let dict = Dictionary::load(cfg.dictionary_file())
        .with_context(|| format!("loading dictionary from {:?}", cfg.dictionary_file()))?;

    match cfg.action {
        Action::Restart => {
            send_one(&cfg, &dict, Action::Stop)?;
            thread::sleep(Duration::from_secs(cfg.delay));
            send_one(&cfg, &dict, Action::Start)?;
        }
        other => send_one(&cfg, &dict, other)?,
    }

    if !args.clean {
        cfg.save_cache(cache_path()).context("persisting config cache")?;
    }

    Ok(())
}

fn send_one(cfg: &Config, dict: &Dictionary, action: Action) -> anyhow::Result<()> {
    let avps = build_avps(cfg, dict, action).context("assembling AVPs")?;

    let mut message = Message::new(PacketCode::AccountingRequest, 0, &cfg.radius_secret);
    for avp in avps {
        message.add_avp(avp)?;
    }
    let packet = message.encode(dict).context("encoding message")?;

    transport::send(&cfg.radius_dest, cfg.radius_port, &packet)
        .context("sending accounting packet")?;

    Ok(())
}
