use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use colored::Colorize;
use pbx_config::Config;
use pbx_store::{Direction, PartyId, Store};
use serde_json::json;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config_path = match cli.config {
        Some(path) => path,
        None => Config::default_path()
            .context("cannot locate the org registry: pass --config or set PBX_CONFIG or HOME")?,
    };
    let session = Session {
        config_path,
        format: cli.format,
    };

    match cli.command {
        Command::Org(args) => cmd_org(&session, args.action),
        Command::Local(args) => cmd_local(&session, args.action),
        Command::Send(args) => cmd_send(&session, args),
        Command::Get(args) => cmd_get(&session, args),
        Command::Push(args) => cmd_push(&session, args),
        Command::Pop(args) => cmd_pop(&session, args),
        Command::Size(args) => cmd_size(&session, args),
    }
}

/// What every command needs besides its own arguments.
struct Session {
    config_path: PathBuf,
    format: OutputFormat,
}

impl Session {
    /// Open the store of `org`, acting as `as_id` when given.
    fn store(&self, org: &str, as_id: Option<&str>) -> anyhow::Result<Store> {
        let config = Config::load(&self.config_path)
            .with_context(|| format!("loading org registry {}", self.config_path.display()))?;
        let Some(entry) = config.org(org) else {
            bail!("unknown org '{org}' (see `pbx org ls`)");
        };
        let store = Store::open(&entry.path, None)
            .with_context(|| format!("opening store for org '{org}'"))?;
        match as_id {
            Some(id) => Ok(store.with_identity(party(id)?)),
            None => Ok(store),
        }
    }

    fn json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }
}

fn party(id: &str) -> anyhow::Result<PartyId> {
    PartyId::new(id).with_context(|| format!("invalid party id '{id}'"))
}

/// The given content, or all of stdin when none was given.
fn content_or_stdin(content: Option<String>) -> anyhow::Result<Vec<u8>> {
    match content {
        Some(content) => Ok(content.into_bytes()),
        None => {
            let mut buf = Vec::new();
            io::stdin().read_to_end(&mut buf).context("reading content from stdin")?;
            Ok(buf)
        }
    }
}

/// Print a payload: raw bytes for text output, a JSON object otherwise.
fn emit_payload(session: &Session, content: &[u8], fields: serde_json::Value) -> anyhow::Result<()> {
    if session.json() {
        let mut obj = fields;
        obj["content"] = json!(String::from_utf8_lossy(content));
        println!("{obj}");
    } else {
        let mut stdout = io::stdout().lock();
        stdout.write_all(content)?;
        stdout.flush()?;
    }
    Ok(())
}

fn cmd_org(session: &Session, action: OrgAction) -> anyhow::Result<()> {
    let mut config = Config::load_or_default(&session.config_path)
        .with_context(|| format!("loading org registry {}", session.config_path.display()))?;

    match action {
        OrgAction::Add { name, path } => {
            let path = absolute(&path)?;
            config.add_org(&name, &path);
            config.save()?;
            if session.json() {
                println!("{}", json!({ "added": name, "path": path }));
            } else {
                println!("{} Registered {} → {}", "✓".green().bold(), name.bold(), path.display());
            }
        }
        OrgAction::Rm { name } => {
            if !config.remove_org(&name) {
                bail!("unknown org '{name}'");
            }
            config.save()?;
            if session.json() {
                println!("{}", json!({ "removed": name }));
            } else {
                println!("Removed org {}", name.bold());
            }
        }
        OrgAction::Ls => {
            if session.json() {
                let orgs: Vec<_> = config
                    .orgs()
                    .iter()
                    .map(|o| json!({ "name": o.name, "path": o.path }))
                    .collect();
                println!("{}", json!(orgs));
            } else if config.orgs().is_empty() {
                println!("No orgs registered.");
            } else {
                for org in config.orgs() {
                    println!("{}\t{}", org.name.bold(), org.path.display());
                }
            }
        }
    }
    Ok(())
}

fn cmd_local(session: &Session, action: LocalAction) -> anyhow::Result<()> {
    match action {
        LocalAction::Write { org, name, content } => {
            let store = session.store(&org, None)?;
            let content = content_or_stdin(content)?;
            store.write_local(&name, &content)?;
            if session.json() {
                println!("{}", json!({ "written": name, "bytes": content.len() }));
            } else {
                println!("{} Wrote {} ({} bytes)", "✓".green(), name.bold(), content.len());
            }
            Ok(())
        }
        LocalAction::Read { org, name } => {
            let store = session.store(&org, None)?;
            let content = store.read_local(&name)?;
            emit_payload(session, &content, json!({ "name": name }))
        }
    }
}

fn cmd_send(session: &Session, args: SendArgs) -> anyhow::Result<()> {
    let store = session.store(&args.org, None)?;
    let to = party(&args.to)?;
    let content = content_or_stdin(args.content)?;
    if args.private {
        store.send_private(&to, &args.name, &content)?;
    } else {
        store.send_public(&to, &args.name, &content)?;
    }

    let tier = if args.private { "private" } else { "public" };
    if session.json() {
        println!("{}", json!({ "to": to.as_str(), "name": args.name, "tier": tier }));
    } else {
        println!("{} Sent {} to {} ({})", "✓".green(), args.name.bold(), to.as_str().yellow(), tier);
    }
    Ok(())
}

fn cmd_get(session: &Session, args: GetArgs) -> anyhow::Result<()> {
    let store = session.store(&args.org, None)?;
    let from = party(&args.from)?;
    let content = if args.private {
        store.get_private(&from, &args.name)?
    } else {
        store.get_public(&from, &args.name)?
    };
    emit_payload(session, &content, json!({ "from": from.as_str(), "name": args.name }))
}

fn cmd_push(session: &Session, args: PushArgs) -> anyhow::Result<()> {
    let store = session.store(&args.org, args.as_id.as_deref())?;
    let content = content_or_stdin(args.content)?;
    let (owner, token) = match &args.to {
        Some(to) => {
            let to = party(to)?;
            let token = store.push_incoming(&to, &args.queue, &content)?;
            (to, token)
        }
        None => {
            let token = store.push_outgoing(&args.queue, &content)?;
            let owner = store.identity().cloned().context("--outgoing needs --as")?;
            (owner, token)
        }
    };
    let direction = if args.to.is_some() { Direction::Incoming } else { Direction::Outgoing };

    if session.json() {
        println!(
            "{}",
            json!({
                "owner": owner.as_str(),
                "direction": direction,
                "queue": args.queue,
                "token": token.as_str(),
            })
        );
    } else {
        println!(
            "{} Queued {} in {}/{}/{}",
            "✓".green(),
            token.as_str().dimmed(),
            owner.as_str().yellow(),
            direction,
            args.queue.bold()
        );
    }
    Ok(())
}

fn cmd_pop(session: &Session, args: PopArgs) -> anyhow::Result<()> {
    let store = session.store(&args.org, args.as_id.as_deref())?;
    let content = match &args.from {
        Some(from) => store.pop_outgoing(&party(from)?, &args.queue)?,
        None => store.pop_incoming(&args.queue)?,
    };
    emit_payload(session, &content, json!({ "queue": args.queue }))
}

fn cmd_size(session: &Session, args: SizeArgs) -> anyhow::Result<()> {
    let store = session.store(&args.org, None)?;
    let owner = party(&args.id)?;
    let size = store.size(&owner, args.direction, &args.queue)?;
    if session.json() {
        println!(
            "{}",
            json!({
                "owner": owner.as_str(),
                "direction": args.direction,
                "queue": args.queue,
                "size": size,
            })
        );
    } else {
        println!("{size}");
    }
    Ok(())
}

/// Registered paths are stored absolute so the registry works from any cwd.
fn absolute(path: &Path) -> anyhow::Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().context("resolving the current directory")?;
    Ok(cwd.join(path))
}
