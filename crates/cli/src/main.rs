// FILE: crates/cli/src/main.rs

use anyhow::Result;
use clap::{Arg, ArgAction, Command};

mod commands;

fn sync_pair_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("local")
            .short('l')
            .long("local")
            .value_name("DIR")
            .required(true)
            .help("Local directory root"),
    )
    .arg(
        Arg::new("remote")
            .short('r')
            .long("remote")
            .value_name("DIR")
            .required(true)
            .help("Remote directory root (a second local directory)"),
    )
}

fn compare_args(cmd: Command) -> Command {
    sync_pair_args(cmd)
        .arg(
            Arg::new("direction")
                .short('d')
                .long("direction")
                .value_name("DIR")
                .default_value("bidirectional")
                .help("Sync direction: bidirectional, local-to-remote, remote-to-local"),
        )
        .arg(
            Arg::new("checksum")
                .long("checksum")
                .action(ArgAction::SetTrue)
                .help("Compare content checksums (slower)"),
        )
        .arg(
            Arg::new("exclude")
                .short('x')
                .long("exclude")
                .value_name("PATTERN")
                .action(ArgAction::Append)
                .help("Extra exclude pattern (substring, or *.ext suffix)"),
        )
        .arg(
            Arg::new("use-index")
                .long("use-index")
                .action(ArgAction::SetTrue)
                .help("Use the last-synced index to detect true conflicts"),
        )
}

fn build_cli() -> Command {
    Command::new("driftsync")
        .version("0.1.0")
        .about("Bidirectional directory sync with resumable journaling")
        .arg(
            Arg::new("state-dir")
                .long("state-dir")
                .value_name("DIR")
                .global(true)
                .help("Override the journal/index state directory"),
        )
        .subcommand(compare_args(
            Command::new("compare").about("Compare two trees and list differences"),
        ))
        .subcommand(
            compare_args(Command::new("sync").about("Compare, then transfer the differences"))
                .arg(
                    Arg::new("resolve")
                        .long("resolve")
                        .value_name("STRATEGY")
                        .value_parser(["keep-newer", "upload", "download", "skip"])
                        .help("Bulk conflict resolution strategy"),
                )
                .arg(
                    Arg::new("retries")
                        .long("retries")
                        .value_name("N")
                        .default_value("3")
                        .help("Attempt budget per entry"),
                )
                .arg(
                    Arg::new("timeout")
                        .long("timeout")
                        .value_name("MS")
                        .default_value("30000")
                        .help("Per-attempt timeout in milliseconds (0 = unbounded)"),
                )
                .arg(
                    Arg::new("verify")
                        .long("verify")
                        .value_name("POLICY")
                        .default_value("size_only")
                        .help("Download verification: none, size_only, size_and_mtime, full"),
                )
                .arg(
                    Arg::new("profile")
                        .short('p')
                        .long("profile")
                        .value_name("ID")
                        .help("Apply a named profile (overrides other options)"),
                )
                .arg(
                    Arg::new("limit-down")
                        .long("limit-down")
                        .value_name("KBPS")
                        .default_value("0")
                        .help("Download speed cap in KB/s (0 = unlimited)"),
                )
                .arg(
                    Arg::new("limit-up")
                        .long("limit-up")
                        .value_name("KBPS")
                        .default_value("0")
                        .help("Upload speed cap in KB/s (0 = unlimited)"),
                )
                .arg(
                    Arg::new("dry-run")
                        .long("dry-run")
                        .action(ArgAction::SetTrue)
                        .help("Print the transfer plan without executing it"),
                ),
        )
        .subcommand(sync_pair_args(
            Command::new("resume").about("Resume an interrupted sync from its journal"),
        ))
        .subcommand(
            Command::new("journals")
                .about("Inspect and manage persisted journals")
                .subcommand(Command::new("list").about("List persisted journals"))
                .subcommand(
                    Command::new("cleanup")
                        .about("Delete journals older than a cutoff")
                        .arg(
                            Arg::new("days")
                                .long("days")
                                .value_name("N")
                                .default_value("30")
                                .help("Maximum journal age in days"),
                        ),
                )
                .subcommand(Command::new("clear").about("Delete every persisted journal"))
                .subcommand(sync_pair_args(
                    Command::new("sign")
                        .about("Sign a journal with HMAC-SHA256")
                ).arg(
                    Arg::new("key")
                        .long("key")
                        .value_name("HEX")
                        .required(true)
                        .help("Signing key, hex-encoded, at least 32 bytes"),
                ))
                .subcommand(sync_pair_args(
                    Command::new("verify")
                        .about("Verify a journal's stored signature")
                ).arg(
                    Arg::new("key")
                        .long("key")
                        .value_name("HEX")
                        .required(true)
                        .help("Signing key, hex-encoded, at least 32 bytes"),
                )),
        )
        .subcommand(Command::new("profiles").about("List available sync profiles"))
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let matches = build_cli().get_matches();
    let state_dir = matches.get_one::<String>("state-dir").cloned();

    match matches.subcommand() {
        Some(("compare", sub)) => commands::compare(sub, state_dir.as_deref()).await,
        Some(("sync", sub)) => commands::sync(sub, state_dir.as_deref()).await,
        Some(("resume", sub)) => commands::resume(sub, state_dir.as_deref()).await,
        Some(("journals", sub)) => match sub.subcommand() {
            Some(("list", _)) => commands::journals_list(state_dir.as_deref()).await,
            Some(("cleanup", s)) => commands::journals_cleanup(s, state_dir.as_deref()).await,
            Some(("clear", _)) => commands::journals_clear(state_dir.as_deref()).await,
            Some(("sign", s)) => commands::journals_sign(s, state_dir.as_deref()).await,
            Some(("verify", s)) => commands::journals_verify(s, state_dir.as_deref()).await,
            _ => {
                build_cli().print_help()?;
                Ok(())
            }
        },
        Some(("profiles", _)) => commands::profiles_list().await,
        _ => {
            build_cli().print_help()?;
            Ok(())
        }
    }
}
