//! docmode-dump - print the interface graph of a document mode
//!
//! Usage: `docmode-dump [MODE] [--json] [--config FILE]`

use anyhow::{bail, Context, Result};
use docmode_dom::{build_graph, resolve_mode, MemberKind};
use docmode_engine::{Engine, EngineConfig};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct InterfaceDump {
    name: &'static str,
    parent: Option<&'static str>,
    global: bool,
    members: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ModeDump {
    mode: u8,
    compat_mode: &'static str,
    interfaces: Vec<InterfaceDump>,
}

fn member_label(name: &str, kind: MemberKind) -> String {
    match kind {
        MemberKind::Method { length } => format!("{name}({length})"),
        MemberKind::Property { readonly: true } => format!("{name} [ro]"),
        MemberKind::Property { readonly: false } => name.to_string(),
        MemberKind::EventHandler => format!("{name} [handler]"),
    }
}

fn dump(config: &EngineConfig) -> ModeDump {
    let mode = config.mode();
    let graph = build_graph(mode);
    let interfaces = graph
        .iter()
        .map(|node| InterfaceDump {
            name: node.name(),
            parent: node.parent.map(|p| graph.name(p)),
            global: graph.global(node.name()).is_some(),
            members: node.members.iter().map(|m| member_label(m.name, m.kind)).collect(),
        })
        .collect();
    ModeDump {
        mode: mode.version(),
        compat_mode: mode.compat_mode(),
        interfaces,
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = EngineConfig::default();
    let mut json = false;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--json" => json = true,
            "--config" => {
                let path = args.next().context("--config needs a file")?;
                config = EngineConfig::load(&path).with_context(|| format!("loading {path}"))?;
            }
            mode => {
                let requested: i64 = mode.parse().with_context(|| format!("not a document mode: {mode}"))?;
                config.document_mode = Some(requested);
            }
        }
    }
    if let Some(requested) = config.document_mode {
        if resolve_mode(Some(requested)).version() as i64 != requested {
            bail!("document mode {requested} is outside 5..=11");
        }
    }

    // open the start page so the window wiring is exercised as well
    let mut engine = Engine::new(config.clone());
    let id = engine.open_default()?;
    engine.load(id)?;
    tracing::info!(context = %id, url = %config.url, "start page loaded");

    let dump = dump(&config);
    if json {
        println!("{}", serde_json::to_string_pretty(&dump)?);
        return Ok(());
    }
    println!("document mode {} ({})", dump.mode, dump.compat_mode);
    for iface in &dump.interfaces {
        let parent = iface.parent.unwrap_or("-");
        let global = if iface.global { " [global]" } else { "" };
        println!("{} : {}{}", iface.name, parent, global);
        for member in &iface.members {
            println!("    {member}");
        }
    }
    Ok(())
}
