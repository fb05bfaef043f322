use std::path::PathBuf;

use anyhow::{bail, Context};
use chrono::{DateTime, SecondsFormat};
use colored::Colorize;
use serde::Serialize;

use edb::{
    CommitBuilder, CommitMetaInfo, CommitQuery, Diff, Edb, EdbConfig, EdbObject, EntryValue,
    LogEntry, Oid, StageId, Timestamp,
};

use crate::cli::*;

const DEFAULT_DATA_DIR: &str = ".edb";

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let edb = open(cli.config.as_deref(), cli.data_dir)?;
    let out = Output(cli.format);

    match cli.command {
        Command::Stages => cmd_stages(&edb, out),
        Command::Stage(StageArgs { action: StageAction::Create { id, creator } }) => {
            let stage = edb.create_stage(id, &creator)?;
            out.emit(&stage, || {
                println!("{} Created stage {}", "✓".green().bold(), stage.id.to_string().yellow());
            })
        }
        Command::Commit(args) => cmd_commit(&edb, out, args),
        Command::Get(args) => cmd_get(&edb, out, args),
        Command::Head(args) => {
            let at = parse_time_opt(args.at.as_deref())?;
            let objects = edb.get_head(at, stage_id(&args.stage).as_ref())?;
            out.emit(&objects, || print_objects(&objects))
        }
        Command::History(args) => {
            let (oid, stage, from, to) = range(&args)?;
            let versions = edb.get_history(&oid, from, to, stage.as_ref())?;
            out.emit(&versions, || print_objects(&versions))
        }
        Command::Log(args) => {
            let (oid, stage, from, to) = range(&args)?;
            let entries = edb.get_log(&oid, from, to, stage.as_ref())?;
            out.emit(&entries, || print_log(&entries))
        }
        Command::Query(args) => {
            let at = parse_time_opt(args.at.as_deref())?;
            let objects = edb.query_str(&args.query, at, stage_id(&args.stage).as_ref())?;
            out.emit(&objects, || print_objects(&objects))
        }
        Command::Diff(args) => cmd_diff(&edb, out, args),
        Command::Commits(args) => cmd_commits(&edb, out, args),
        Command::Resurrected(stage) => {
            let oids = edb.get_resurrected_oids(stage_id(&stage).as_ref())?;
            out.emit(&oids, || {
                if oids.is_empty() {
                    println!("No resurrected objects.");
                }
                for oid in &oids {
                    println!("{}", oid.to_string().bold());
                }
            })
        }
        Command::Verify(stage) => {
            let report = edb.verify(stage_id(&stage).as_ref())?;
            out.emit(&report, || {
                if report.is_valid() {
                    println!(
                        "{} Stage {}: {} commits, revision chain intact",
                        "✓".green().bold(),
                        report.stage.to_string().yellow(),
                        report.commit_count
                    );
                } else {
                    println!("{} Stage {}:", "✗".red().bold(), report.stage.to_string().yellow());
                    for v in &report.violations {
                        println!("  #{} {:?}: {}", v.position, v.kind, v.description.red());
                    }
                }
            })?;
            if !report.is_valid() {
                bail!("revision chain of stage {} is broken", report.stage);
            }
            Ok(())
        }
    }
}

/// Open the database at `--data-dir`, falling back to the config file's
/// directory and then to `.edb`.
fn open(config: Option<&std::path::Path>, data_dir: Option<PathBuf>) -> anyhow::Result<Edb> {
    let mut config = match config {
        Some(path) => EdbConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => EdbConfig::default(),
    };
    if let Some(dir) = data_dir {
        config.data_dir = Some(dir);
    }
    if config.data_dir.is_none() {
        config.data_dir = Some(PathBuf::from(DEFAULT_DATA_DIR));
    }
    tracing::debug!(data_dir = ?config.data_dir, "opening database");
    Ok(Edb::open(config)?)
}

#[derive(Clone, Copy)]
struct Output(OutputFormat);

impl Output {
    fn emit<T: Serialize>(self, value: &T, text: impl FnOnce()) -> anyhow::Result<()> {
        match self.0 {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
            OutputFormat::Text => text(),
        }
        Ok(())
    }
}

fn cmd_stages(edb: &Edb, out: Output) -> anyhow::Result<()> {
    let stages = edb.stages()?;
    out.emit(&stages, || {
        for stage in &stages {
            let marker = if stage.id.is_root() { "*" } else { " " };
            println!(
                "{} {}  {} {}",
                marker.green(),
                stage.id.to_string().yellow().bold(),
                stage.creator,
                format_time(stage.created_at).dimmed()
            );
        }
    })
}

fn cmd_commit(edb: &Edb, out: Output, args: CommitArgs) -> anyhow::Result<()> {
    let stage = stage_id(&args.stage).unwrap_or_default();
    let mut builder = CommitBuilder::new(args.committer).stage(stage.clone());
    if let Some(context) = args.context {
        builder = builder.context(context);
    }
    if let Some(comment) = args.comment {
        builder = builder.comment(comment);
    }
    for spec in &args.insert {
        let (oid, entries) = parse_object(spec)?;
        let object = entries
            .into_iter()
            .fold(EdbObject::new(oid), |o, (k, v)| o.with_entry(k, v));
        builder = builder.insert(object);
    }
    for spec in &args.update {
        let (oid, entries) = parse_object(spec)?;
        // Unknown OIDs go through as-is and fail validation.
        let mut object = edb
            .get_object(&oid, Some(&stage))?
            .unwrap_or_else(|| EdbObject::new(oid.clone()));
        for (key, value) in entries {
            object.put(key, value);
        }
        builder = builder.update(object);
    }
    for oid in args.delete {
        builder = builder.delete(oid);
    }

    let mut commit = edb.build_commit(builder)?;
    if commit.is_empty() {
        bail!("nothing to commit: pass --insert, --update or --delete");
    }
    let timestamp = edb.commit(&mut commit)?;
    let info = commit.meta_info();
    out.emit(&info, || {
        println!(
            "{} Committed {} to {} at {}",
            "✓".green().bold(),
            info.revision.map(|r| r.short_id()).unwrap_or_default().yellow(),
            stage.to_string().bold(),
            format_time(timestamp)
        );
        println!(
            "  {} inserted, {} updated, {} deleted",
            commit.inserts.len(),
            commit.updates.len(),
            commit.deletions.len()
        );
    })
}

fn cmd_get(edb: &Edb, out: Output, args: GetArgs) -> anyhow::Result<()> {
    let oid = Oid::from(args.oid.as_str());
    let stage = stage_id(&args.stage);
    let object = match parse_time_opt(args.at.as_deref())? {
        Some(at) => edb.get_object_at(&oid, at, stage.as_ref())?,
        None => edb.get_object(&oid, stage.as_ref())?,
    };
    match object {
        Some(object) => out.emit(&object, || print_object(&object)),
        None => bail!("object {oid} not found"),
    }
}

fn cmd_diff(edb: &Edb, out: Output, args: DiffArgs) -> anyhow::Result<()> {
    let from = parse_time(&args.from)?;
    let to = parse_time(&args.to)?;
    let from_stage = args.from_stage.map(StageId::from);
    let to_stage = args.to_stage.map(StageId::from);
    let diff = edb.get_diff(from, to, from_stage.as_ref(), to_stage.as_ref())?;
    out.emit(&diff, || print_diff(&diff))
}

fn cmd_commits(edb: &Edb, out: Output, args: CommitsArgs) -> anyhow::Result<()> {
    let query = CommitQuery {
        committer: args.committer,
        context: args.context,
        from: parse_time_opt(args.from.as_deref())?,
        to: parse_time_opt(args.to.as_deref())?,
    };
    let mut infos = edb.get_revisions_of_matching_commits(&query, stage_id(&args.stage).as_ref())?;
    if let Some(limit) = args.limit {
        // Newest commits are the interesting ones.
        let skip = infos.len().saturating_sub(limit);
        infos.drain(..skip);
    }
    out.emit(&infos, || print_commits(&infos))
}

fn stage_id(opt: &StageOpt) -> Option<StageId> {
    opt.stage.as_deref().map(StageId::from)
}

fn range(args: &RangeArgs) -> anyhow::Result<(Oid, Option<StageId>, Option<Timestamp>, Option<Timestamp>)> {
    Ok((
        Oid::from(args.oid.as_str()),
        stage_id(&args.stage),
        parse_time_opt(args.from.as_deref())?,
        parse_time_opt(args.to.as_deref())?,
    ))
}

/// `OID:key=value,key=value`. Values are typed by [`EntryValue::infer`].
fn parse_object(spec: &str) -> anyhow::Result<(Oid, Vec<(String, EntryValue)>)> {
    let (oid, entries) = spec.split_once(':').unwrap_or((spec, ""));
    if oid.is_empty() {
        bail!("object `{spec}` has no OID");
    }
    let entries = entries
        .split(',')
        .filter(|e| !e.is_empty())
        .map(|entry| match entry.split_once('=') {
            Some((key, value)) if !key.is_empty() => Ok((key.to_string(), EntryValue::infer(value))),
            _ => bail!("entry `{entry}` of `{spec}` is not key=value"),
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok((Oid::from(oid), entries))
}

/// Milliseconds since the epoch, or an RFC 3339 date-time.
fn parse_time(text: &str) -> anyhow::Result<Timestamp> {
    if let Ok(millis) = text.parse::<Timestamp>() {
        return Ok(millis);
    }
    let parsed = DateTime::parse_from_rfc3339(text)
        .with_context(|| format!("`{text}` is neither epoch milliseconds nor an RFC 3339 time"))?;
    Ok(parsed.timestamp_millis())
}

fn parse_time_opt(text: Option<&str>) -> anyhow::Result<Option<Timestamp>> {
    text.map(parse_time).transpose()
}

fn format_time(ts: Timestamp) -> String {
    DateTime::from_timestamp_millis(ts)
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_else(|| ts.to_string())
}

fn print_object(object: &EdbObject) {
    let stamp = object.timestamp.map(format_time).unwrap_or_default();
    println!("{}  {}", object.oid.to_string().yellow().bold(), stamp.dimmed());
    for (key, value) in object.user_entries() {
        println!("  {} = {} {}", key, value, format!("({})", value.type_tag()).dimmed());
    }
    if let Some(version) = object.model_version() {
        println!("  {}", format!("version {version}").dimmed());
    }
}

fn print_objects(objects: &[EdbObject]) {
    if objects.is_empty() {
        println!("No objects.");
    }
    for object in objects {
        print_object(object);
    }
}

fn print_log(entries: &[LogEntry]) {
    if entries.is_empty() {
        println!("No changes.");
    }
    for entry in entries {
        let kind = match entry.kind {
            edb::LogKind::Insert => entry.kind.to_string().green(),
            edb::LogKind::Update => entry.kind.to_string().yellow(),
            edb::LogKind::Delete => entry.kind.to_string().red(),
        };
        println!(
            "{}  {:<6}  {}  {}",
            format_time(entry.timestamp),
            kind,
            entry.oid,
            entry.revision.short_id().dimmed()
        );
    }
}

fn print_commits(infos: &[CommitMetaInfo]) {
    if infos.is_empty() {
        println!("No commits.");
    }
    for info in infos {
        println!(
            "{}  {}  {}",
            info.revision.map(|r| r.short_id()).unwrap_or_default().yellow().bold(),
            info.timestamp.map(format_time).unwrap_or_default(),
            info.committer.cyan()
        );
        if let Some(context) = &info.context {
            println!("  context: {context}");
        }
        if let Some(comment) = &info.comment {
            println!("  {comment}");
        }
    }
}

fn print_diff(diff: &Diff) {
    if diff.is_empty() {
        println!("No changes.");
        return;
    }
    for object in &diff.added {
        println!("{} {}", "+".green().bold(), object.oid.to_string().green());
    }
    for object in &diff.removed {
        println!("{} {}", "-".red().bold(), object.oid.to_string().red());
    }
    for changed in &diff.changed {
        println!("{} {}", "~".yellow().bold(), changed.oid().to_string().yellow());
        for change in &changed.entry_changes().changes {
            match change {
                edb::EntryChange::Added { key, value } => println!("    {} {key} = {value}", "+".green()),
                edb::EntryChange::Removed { key, value } => println!("    {} {key} = {value}", "-".red()),
                edb::EntryChange::Modified { key, old, new } => {
                    println!("    {} {key}: {old} -> {new}", "~".yellow())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn run(dir: &std::path::Path, args: &[&str]) -> anyhow::Result<()> {
        let data_dir = dir.to_string_lossy().into_owned();
        let mut argv = vec!["edb", "--data-dir", data_dir.as_str()];
        argv.extend_from_slice(args);
        run_command(Cli::try_parse_from(argv)?)
    }

    #[test]
    fn parse_object_specs() {
        let (oid, entries) = parse_object("A:name=foo,rating=3,ok=true").unwrap();
        assert_eq!(oid.as_str(), "A");
        assert_eq!(
            entries,
            vec![
                ("name".to_string(), EntryValue::String("foo".into())),
                ("rating".to_string(), EntryValue::Integer(3)),
                ("ok".to_string(), EntryValue::Boolean(true)),
            ]
        );
        assert!(parse_object("B").unwrap().1.is_empty());
        assert!(parse_object(":name=x").is_err());
        assert!(parse_object("A:name").is_err());
    }

    #[test]
    fn parse_times() {
        assert_eq!(parse_time("150").unwrap(), 150);
        assert_eq!(parse_time("1970-01-01T00:00:01Z").unwrap(), 1_000);
        assert!(parse_time("yesterday").is_err());
        assert_eq!(format_time(1_000), "1970-01-01T00:00:01.000Z");
    }

    #[test]
    fn commit_then_read_back() {
        let dir = tempfile::tempdir().unwrap();
        run(dir.path(), &["stage", "create", "dev"]).unwrap();
        run(dir.path(), &["commit", "-s", "dev", "--insert", "A:name=foo"]).unwrap();
        run(dir.path(), &["commit", "-s", "dev", "--update", "A:rating=5"]).unwrap();
        run(dir.path(), &["--format", "json", "history", "A", "-s", "dev"]).unwrap();
        assert!(run(dir.path(), &["get", "A"]).is_err());
        assert!(run(dir.path(), &["commit"]).is_err());

        let edb = Edb::open(EdbConfig::persistent(dir.path())).unwrap();
        let dev = StageId::from("dev");
        let object = edb.get_object(&Oid::from("A"), Some(&dev)).unwrap().unwrap();
        assert_eq!(object.get("name"), Some(&EntryValue::String("foo".into())));
        assert_eq!(object.get("rating"), Some(&EntryValue::Integer(5)));
        assert_eq!(object.model_version(), Some(2));
        assert!(edb.verify(Some(&dev)).unwrap().is_valid());
    }

    #[test]
    fn conflicting_insert_fails() {
        let dir = tempfile::tempdir().unwrap();
        run(dir.path(), &["commit", "--insert", "A:name=foo"]).unwrap();
        let err = run(dir.path(), &["commit", "--insert", "A:name=bar"]).unwrap_err();
        assert!(err.to_string().contains("conflict"), "{err}");
    }
}
