//! WS-Management request renderer.
//!
//! Run with: `wsman --config config.yaml get --resource <URI>`
//!
//! Prints the request envelope for any verb without sending it, and decodes
//! enumeration values. Logs go to stderr so stdout is pure XML.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;
use wsman_client::codec::{EnumRegistry, UNRECOGNIZED};
use wsman_client::message::identify;
use wsman_client::{
    ClientConfig, EnumerationContext, Instance, Properties, Resource, SelectorSet, Session,
};

/// Render WS-Management request envelopes (dry run).
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML)
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// MessageID of the first rendered message
    #[arg(long, default_value_t = 0)]
    message_id: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Get an instance (or the singleton without selectors)
    Get {
        #[arg(short, long, value_parser = resource_uri)]
        resource: String,
        /// Selector as Name=Value, repeatable, order preserved
        #[arg(short, long = "selector", value_parser = parse_pair)]
        selectors: Vec<(String, String)>,
    },
    /// Start an enumeration
    Enumerate {
        #[arg(short, long, value_parser = resource_uri)]
        resource: String,
    },
    /// Pull the next page of an enumeration
    Pull {
        #[arg(short, long, value_parser = resource_uri)]
        resource: String,
        #[arg(long)]
        context: String,
    },
    /// Release an enumeration context
    Release {
        #[arg(short, long, value_parser = resource_uri)]
        resource: String,
        #[arg(long)]
        context: String,
    },
    /// Replace an instance
    Put {
        #[arg(short, long, value_parser = resource_uri)]
        resource: String,
        #[arg(short, long = "selector", value_parser = parse_pair)]
        selectors: Vec<(String, String)>,
        /// Property as Name=Value, repeatable
        #[arg(short, long = "property", value_parser = parse_pair)]
        properties: Vec<(String, String)>,
    },
    /// Create an instance
    Create {
        #[arg(short, long, value_parser = resource_uri)]
        resource: String,
        #[arg(short, long = "property", value_parser = parse_pair)]
        properties: Vec<(String, String)>,
    },
    /// Delete an instance
    Delete {
        #[arg(short, long, value_parser = resource_uri)]
        resource: String,
        #[arg(short, long = "selector", value_parser = parse_pair, required = true)]
        selectors: Vec<(String, String)>,
    },
    /// Invoke a class method
    Invoke {
        #[arg(short, long, value_parser = resource_uri)]
        resource: String,
        #[arg(short, long)]
        method: String,
        #[arg(short, long = "selector", value_parser = parse_pair)]
        selectors: Vec<(String, String)>,
        /// Parameter as Name=Value, repeatable
        #[arg(short, long = "param", value_parser = parse_pair)]
        params: Vec<(String, String)>,
    },
    /// RequestStateChange with one RequestedState
    RequestStateChange {
        #[arg(short, long, value_parser = resource_uri)]
        resource: String,
        #[arg(long)]
        state: u32,
    },
    /// WS-Man Identify
    Identify,
    /// Decode an enumeration value
    Decode {
        /// Enum type tag, e.g. EnabledState
        #[arg(short, long)]
        kind: String,
        #[arg(short, long, allow_hyphen_values = true)]
        value: i64,
    },
}

/// A resource URI whose last path segment names a class.
fn resource_uri(raw: &str) -> std::result::Result<String, String> {
    if raw.is_empty() {
        return Err("resource URI must not be empty".to_string());
    }
    if raw.rsplit('/').next().map_or(true, str::is_empty) {
        return Err(format!("resource URI {:?} does not end in a class name", raw));
    }
    Ok(raw.to_string())
}

fn parse_pair(raw: &str) -> std::result::Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected Name=Value, got {:?}", raw))
}

fn selector_set(pairs: Vec<(String, String)>) -> Option<SelectorSet> {
    if pairs.is_empty() {
        None
    } else {
        Some(pairs.into_iter().collect())
    }
}

fn properties(pairs: Vec<(String, String)>) -> Properties {
    pairs
        .into_iter()
        .fold(Properties::new(), |props, (k, v)| props.with(k, v))
}

fn instance(resource: &Resource<'_>, pairs: Vec<(String, String)>) -> Instance {
    Instance {
        class_name: resource.class_name().to_string(),
        properties: properties(pairs),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = args.log_level.parse().unwrap_or(Level::WARN);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    // Load configuration
    let config = if args.config.exists() {
        info!("Config file: {}", args.config.display());
        ClientConfig::load(&args.config).context("Failed to load config file")?
    } else {
        debug!("Config file not found, using defaults");
        ClientConfig::default()
    };

    info!(
        destination = %config.session.destination,
        max_elements = config.enumeration.max_elements,
        "Configuration loaded"
    );

    let session = Session::starting_at(config, args.message_id);

    let xml = match args.command {
        Command::Get { resource, selectors } => {
            session.resource(resource).get(selector_set(selectors)).into_string()
        }
        Command::Enumerate { resource } => session.resource(resource).enumerate().into_string(),
        Command::Pull { resource, context } => session
            .resource(resource)
            .pull(&EnumerationContext::new(context))
            .into_string(),
        Command::Release { resource, context } => session
            .resource(resource)
            .release(&EnumerationContext::new(context))
            .into_string(),
        Command::Put {
            resource,
            selectors,
            properties: props,
        } => {
            let resource = session.resource(resource);
            let body = instance(&resource, props);
            resource.put(selector_set(selectors), &body).into_string()
        }
        Command::Create {
            resource,
            properties: props,
        } => {
            let resource = session.resource(resource);
            let body = instance(&resource, props);
            resource.create(&body).into_string()
        }
        Command::Delete { resource, selectors } => {
            let selectors = selector_set(selectors).context("Delete requires a selector")?;
            session.resource(resource).delete(selectors).into_string()
        }
        Command::Invoke {
            resource,
            method,
            selectors,
            params,
        } => session
            .resource(resource)
            .invoke_on(&method, selector_set(selectors), &properties(params))
            .into_string(),
        Command::RequestStateChange { resource, state } => {
            session.resource(resource).request_state_change(state).into_string()
        }
        Command::Identify => identify().into_string(),
        Command::Decode { kind, value } => {
            let registry = EnumRegistry::global();
            let name = registry.decode(&kind, value);
            if registry.table(&kind).is_none() {
                anyhow::bail!(
                    "unknown enum type {:?}; known types: {}",
                    kind,
                    registry.tags().join(", ")
                );
            }
            if name == UNRECOGNIZED {
                debug!(kind = %kind, value, "Value has no symbol");
            }
            name.to_string()
        }
    };

    println!("{}", xml);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CERT: &str = "http://intel.com/wbem/wscim/1/amt-schema/1/AMT_PublicKeyCertificate";

    #[test]
    fn test_resource_uri_validation() {
        assert_eq!(resource_uri(CERT).as_deref(), Ok(CERT));
        assert!(resource_uri("").is_err());
        assert!(resource_uri("http://intel.com/wbem/wscim/1/amt-schema/1/").is_err());
    }

    #[test]
    fn test_instance_takes_class_from_resource() {
        let session = Session::default();
        let resource = session.resource(CERT);
        let body = instance(&resource, vec![("ElementName".into(), "root".into())]);
        assert_eq!(body.class_name, "AMT_PublicKeyCertificate");
        assert_eq!(
            body.to_xml(CERT),
            format!(
                r#"<h:AMT_PublicKeyCertificate xmlns:h="{}"><h:ElementName>root</h:ElementName></h:AMT_PublicKeyCertificate>"#,
                CERT
            )
        );
    }

    #[test]
    fn test_parse_pair() {
        assert_eq!(parse_pair("Name=a=b"), Ok(("Name".to_string(), "a=b".to_string())));
        assert!(parse_pair("=x").is_err());
        assert!(parse_pair("novalue").is_err());
    }
}
