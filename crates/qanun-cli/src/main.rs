//! Policy CLI: rule validation, one-shot decisions and journal
//! maintenance.
//!
//! Exit codes: 0 success, 1 policy denial or integrity failure, 2 bad
//! input.

#![deny(unsafe_code)]

use audit_log::{csv_from_entries, AuditFilter, AuditLog};
use clap::{Parser, Subcommand};
use qanun_core::types::{Action, Rule};
use rule_engine::{ConflictKind, RuleEngine};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

const DEFAULT_AUDIT_PATH: &str = "./data/audit.jsonl";

#[derive(Parser, Debug)]
#[command(name = "qanun", about = "Governed-agent policy and audit CLI")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a rules file and list pairwise conflicts
    Validate {
        /// JSON array of rules
        rules: PathBuf,
    },
    /// Evaluate facts against rules, append to the journal, print the decision
    Decide {
        rules: PathBuf,
        facts: PathBuf,
        /// Journal location (defaults to AUDIT_PATH)
        #[arg(long)]
        journal: Option<PathBuf>,
    },
    /// Verify the journal hash chain from genesis
    Verify {
        #[arg(long)]
        journal: Option<PathBuf>,
    },
    /// Print journal statistics
    Inspect {
        #[arg(long)]
        journal: Option<PathBuf>,
    },
    /// Export the journal as CSV
    Export {
        #[arg(long)]
        journal: Option<PathBuf>,
        /// Write to a file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    telemetry::init_compact_logging();
    let cli = Cli::parse();
    let code = match cli.cmd {
        Command::Validate { rules } => cmd_validate(&rules),
        Command::Decide { rules, facts, journal } => {
            cmd_decide(&rules, &facts, &journal_path(journal))
        }
        Command::Verify { journal } => cmd_verify(&journal_path(journal)),
        Command::Inspect { journal } => cmd_inspect(&journal_path(journal)),
        Command::Export { journal, out } => cmd_export(&journal_path(journal), out.as_deref()),
    };
    ExitCode::from(code)
}

fn journal_path(flag: Option<PathBuf>) -> PathBuf {
    flag.unwrap_or_else(|| {
        PathBuf::from(std::env::var("AUDIT_PATH").unwrap_or_else(|_| DEFAULT_AUDIT_PATH.into()))
    })
}

fn cmd_validate(rules_path: &Path) -> u8 {
    let raw = match std::fs::read_to_string(rules_path) {
        Ok(raw) => raw,
        Err(e) => {
            eprintln!("cannot read {}: {e}", rules_path.display());
            return 2;
        }
    };
    let items: Vec<Value> = match serde_json::from_str(&raw) {
        Ok(items) => items,
        Err(e) => {
            eprintln!("malformed rules file: {e}");
            return 2;
        }
    };

    let mut valid_rules = Vec::new();
    let mut all_valid = true;
    for (i, item) in items.into_iter().enumerate() {
        let id = item
            .get("id")
            .and_then(Value::as_str)
            .map_or_else(|| format!("#{i}"), ToString::to_string);
        match serde_json::from_value::<Rule>(item) {
            Ok(rule) => match expr::compile(&rule.condition) {
                Ok(_) => {
                    println!("VALID   {id}");
                    valid_rules.push(rule);
                }
                Err(e) => {
                    all_valid = false;
                    println!("INVALID {id}: {e}");
                }
            },
            Err(e) => {
                all_valid = false;
                println!("INVALID {id}: {e}");
            }
        }
    }

    let engine = RuleEngine::new();
    if let Err(e) = engine.load_rules(valid_rules) {
        eprintln!("load failed: {e}");
        return 2;
    }
    let mut contradictions = 0;
    for conflict in engine.detect_conflicts() {
        match conflict.kind {
            ConflictKind::ContradictoryActions => {
                contradictions += 1;
                println!("CONFLICT {} vs {}: {}", conflict.rule_a, conflict.rule_b, conflict.description);
            }
            ConflictKind::Duplicate => {
                println!("DUPLICATE {} vs {}: {}", conflict.rule_a, conflict.rule_b, conflict.description);
            }
        }
    }

    u8::from(!(all_valid && contradictions == 0))
}

fn cmd_decide(rules_path: &Path, facts_path: &Path, journal: &Path) -> u8 {
    let rules: Vec<Rule> = match read_json(rules_path) {
        Ok(rules) => rules,
        Err(code) => return code,
    };
    let facts: Value = match read_json(facts_path) {
        Ok(facts) => facts,
        Err(code) => return code,
    };

    let engine = RuleEngine::new();
    if let Err(e) = engine.load_rules(rules) {
        eprintln!("invalid rules: {e}");
        return 2;
    }
    let log = match AuditLog::open(journal) {
        Ok(log) => log,
        Err(e) => {
            eprintln!("cannot open journal {}: {e}", journal.display());
            return 2;
        }
    };

    let decision = engine.evaluate(&facts);
    let entry = log.append(&decision, &facts);
    let summary = json!({
        "result": decision.result,
        "score": decision.score,
        "reason": decision.reason,
        "rule": decision.matched_rule.as_ref().map(|r| r.name.clone()),
        "auditId": entry.id,
    });
    println!("{}", serde_json::to_string_pretty(&summary).unwrap_or_default());

    u8::from(decision.result == Action::Rejected)
}

fn cmd_verify(journal: &Path) -> u8 {
    let log = match AuditLog::open(journal) {
        Ok(log) => log,
        Err(e) => {
            eprintln!("cannot open journal {}: {e}", journal.display());
            return 2;
        }
    };
    match log.verify_full_report() {
        Ok(report) => {
            println!("{}", serde_json::to_string_pretty(&report).unwrap_or_default());
            if report.valid {
                0
            } else {
                if let Some(index) = report.first_invalid {
                    eprintln!("chain broken at line {}", index + 1);
                }
                1
            }
        }
        Err(e) => {
            eprintln!("cannot verify journal: {e}");
            2
        }
    }
}

fn cmd_inspect(journal: &Path) -> u8 {
    let log = match AuditLog::open(journal) {
        Ok(log) => log,
        Err(e) => {
            eprintln!("cannot open journal {}: {e}", journal.display());
            return 2;
        }
    };
    let entries = match log.query_from_disk(&AuditFilter::default()) {
        Ok(entries) => entries,
        Err(e) => {
            eprintln!("cannot read journal: {e}");
            return 2;
        }
    };
    let mut by_result = BTreeMap::<String, usize>::new();
    for entry in &entries {
        *by_result.entry(entry.output.result.to_string()).or_default() += 1;
    }
    let out = json!({
        "total": entries.len(),
        "first_timestamp": entries.first().map(|e| e.timestamp.clone()),
        "last_timestamp": entries.last().map(|e| e.timestamp.clone()),
        "by_result": by_result,
    });
    println!("{}", serde_json::to_string_pretty(&out).unwrap_or_default());
    0
}

fn cmd_export(journal: &Path, out: Option<&Path>) -> u8 {
    let log = match AuditLog::open(journal) {
        Ok(log) => log,
        Err(e) => {
            eprintln!("cannot open journal {}: {e}", journal.display());
            return 2;
        }
    };
    let entries = match log.query_from_disk(&AuditFilter::default()) {
        Ok(entries) => entries,
        Err(e) => {
            eprintln!("cannot read journal: {e}");
            return 2;
        }
    };
    let csv = csv_from_entries(&entries);
    match out {
        Some(path) => {
            if let Err(e) = std::fs::write(path, csv) {
                eprintln!("cannot write {}: {e}", path.display());
                return 2;
            }
            println!("wrote CSV to {}", path.display());
        }
        None => print!("{csv}"),
    }
    0
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, u8> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        eprintln!("cannot read {}: {e}", path.display());
        2u8
    })?;
    serde_json::from_str(&raw).map_err(|e| {
        eprintln!("malformed {}: {e}", path.display());
        2u8
    })
}
