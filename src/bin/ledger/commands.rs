//! Command execution against an on-disk ledger.

use crate::cli::{Cli, Command, CreateArgs, ListArgs, OutcomeArg, UpdateArgs};
use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use chrono::TimeDelta;
use std::fmt::Display;
use std::io::Write;
use tracing::{debug, error};
use workledger::config::{DEFAULT_CONFIG_FILE, LedgerConfig, StorageBackend};
use workledger::delegation::domain::{Confidence, Delegation, DelegationHandle, Outcome};
use workledger::delegation::error::DelegationError;
use workledger::delegation::services::{Advancement, DelegateRequest, ReportReceipt};
use workledger::error::{LedgerError, LedgerResult};
use workledger::ledger::FileLedger;
use workledger::lifecycle::domain::Finding;
use workledger::lifecycle::services::{LifecycleError, TransitionOutcome, TransitionRequest};
use workledger::record::codec;
use workledger::record::domain::{
    ActorId, Priority, Record, RecordBuilder, RecordId, RecordKind, RecordStatus,
};
use workledger::store::query::RecordQuery;

/// Runs one parsed command, writing its report to `out`.
pub(crate) async fn run<W: Write>(cli: Cli, out: &mut W) -> LedgerResult<()> {
    let config = load_config(cli.config.as_deref(), cli.root)?;
    let ledger = FileLedger::open(config).await?;
    let actor = match cli.actor {
        Some(name) => ActorId::new(name)?,
        None => ledger.config().coordinator_actor()?,
    };
    debug!(actor = %actor, command = ?cli.command, "running command");

    match cli.command {
        Command::Create(args) => create(&ledger, args, out).await,
        Command::Update(args) => update(&ledger, args, out).await,
        Command::Transition {
            id,
            status,
            unarchive,
        } => transition(&ledger, &id, &status, unarchive, actor, out).await,
        Command::Delegate {
            id,
            to,
            timeout_secs,
            instructions,
        } => delegate(&ledger, &id, to, timeout_secs, instructions.as_deref(), out).await,
        Command::Accept { handle, start } => accept(&ledger, &handle, start, out).await,
        Command::Report {
            handle,
            outcome,
            message,
            confidence,
        } => report(&ledger, &handle, outcome, message, confidence, out).await,
        Command::Escalate { handle, reason } => {
            let escalated = ledger
                .coordinator()
                .escalate(parse_handle(&handle)?, reason)
                .await?;
            write_delegation(out, &escalated)
        }
        Command::Status { id } => status(&ledger, &id, out).await,
        Command::List(args) => list(&ledger, &args, out).await,
        Command::Check => check(&ledger, out).await,
    }
}

/// Extra lines worth printing beneath an error message.
pub(crate) fn error_details(err: &LedgerError) -> Vec<String> {
    let (LedgerError::Lifecycle(inner) | LedgerError::Delegation(DelegationError::Lifecycle(inner))) =
        err
    else {
        return Vec::new();
    };
    let LifecycleError::ValidationBlocked { findings, .. } = inner else {
        return Vec::new();
    };
    findings.iter().map(ToString::to_string).collect()
}

/// Resolves the configuration: an explicit file, else `ledger.toml` in the
/// working directory when present, else defaults. `root` overrides the
/// configured ledger root.
pub(crate) fn load_config(
    path: Option<&Utf8Path>,
    root: Option<Utf8PathBuf>,
) -> LedgerResult<LedgerConfig> {
    let mut config = match path {
        Some(explicit) => LedgerConfig::load(explicit)?,
        None if default_config_present()? => {
            LedgerConfig::load(Utf8Path::new(DEFAULT_CONFIG_FILE))?
        }
        None => LedgerConfig::default(),
    };
    if let Some(override_root) = root {
        config.root = override_root;
    }
    if config.storage != StorageBackend::Filesystem {
        return Err(LedgerError::InvalidInput(
            "the command line needs filesystem storage".to_owned(),
        ));
    }
    Ok(config)
}

fn default_config_present() -> LedgerResult<bool> {
    let cwd = Dir::open_ambient_dir(".", ambient_authority())?;
    Ok(cwd.is_file(DEFAULT_CONFIG_FILE))
}

async fn create<W: Write>(ledger: &FileLedger, args: CreateArgs, out: &mut W) -> LedgerResult<()> {
    let record = match args.from {
        Some(path) => {
            let imported = codec::decode(&read_document(&path)?)?;
            ledger.store().create(imported).await?
        }
        None => ledger.create_record(builder_from(args)?).await?,
    };
    writeln!(
        out,
        "created {} [{}] {}",
        record.id(),
        record.status(),
        record.title()
    )?;
    Ok(())
}

fn builder_from(args: CreateArgs) -> LedgerResult<RecordBuilder> {
    let id = args
        .id
        .ok_or_else(|| LedgerError::InvalidInput("an id is required".to_owned()))?;
    let title = args
        .title
        .ok_or_else(|| LedgerError::InvalidInput("a title is required".to_owned()))?;
    let kind = RecordKind::try_from(args.kind.as_str()).map_err(|err| invalid(&err))?;
    let mut builder = Record::builder(RecordId::new(id)?, title, kind)
        .with_dependencies(parse_ids(&args.depends_on)?)
        .with_tags(args.tags);
    if let Some(raw) = args.priority.as_deref() {
        builder = builder.with_priority(parse_priority(raw)?);
    }
    if let Some(parent) = args.parent {
        builder = builder.with_parent(RecordId::new(parent)?);
    }
    if let Some(assignee) = args.assignee {
        builder = builder.with_assignee(assignee);
    }
    if let Some(schema) = args.schema {
        builder = builder.with_schema_ref(schema);
    }
    Ok(builder)
}

fn read_document(path: &Utf8Path) -> LedgerResult<Vec<u8>> {
    let directory = path
        .parent()
        .filter(|parent| !parent.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    let file_name = path
        .file_name()
        .ok_or_else(|| LedgerError::InvalidInput(format!("{path} names no file")))?;
    let dir = Dir::open_ambient_dir(directory, ambient_authority())?;
    Ok(dir.read(file_name)?)
}

async fn update<W: Write>(ledger: &FileLedger, args: UpdateArgs, out: &mut W) -> LedgerResult<()> {
    let id = RecordId::new(args.id)?;
    let dependencies = parse_ids(&args.depends_on)?;
    let priority = args.priority.as_deref().map(parse_priority).transpose()?;
    let UpdateArgs {
        title,
        assignee,
        unassign,
        tags,
        ..
    } = args;

    let updated = ledger
        .store()
        .update(&id, move |record| {
            let mut edited = dependencies
                .into_iter()
                .fold(record, Record::with_dependency);
            edited = tags.into_iter().fold(edited, Record::with_tag);
            if let Some(new_title) = title {
                edited = edited.with_title(new_title);
            }
            if let Some(new_priority) = priority {
                edited = edited.with_priority(new_priority);
            }
            if unassign {
                edited = edited.with_assignee(None);
            } else if assignee.is_some() {
                edited = edited.with_assignee(assignee);
            }
            edited
        })
        .await?;
    writeln!(
        out,
        "updated {} (revision {})",
        updated.id(),
        updated.revision()
    )?;
    Ok(())
}

async fn transition<W: Write>(
    ledger: &FileLedger,
    id: &str,
    status: &str,
    unarchive: bool,
    actor: ActorId,
    out: &mut W,
) -> LedgerResult<()> {
    let target = RecordStatus::try_from(status).map_err(|err| invalid(&err))?;
    let mut request = TransitionRequest::new(RecordId::new(id)?, target, actor);
    if unarchive {
        request = request.with_unarchive_override();
    }
    match ledger.engine().transition(request).await? {
        TransitionOutcome::Applied(record) => {
            writeln!(out, "{} {}", record.id(), record.status().label())?;
        }
        TransitionOutcome::AwaitingReview { record, findings } => {
            writeln!(out, "{} awaiting review", record.id())?;
            write_findings(out, &findings)?;
        }
    }
    Ok(())
}

async fn delegate<W: Write>(
    ledger: &FileLedger,
    id: &str,
    to: String,
    timeout_secs: Option<i64>,
    instructions: Option<&str>,
    out: &mut W,
) -> LedgerResult<()> {
    let timeout = match timeout_secs {
        Some(secs) => TimeDelta::try_seconds(secs)
            .ok_or_else(|| LedgerError::InvalidInput(format!("timeout {secs}s is out of range")))?,
        None => ledger.default_timeout(),
    };
    let payload = instructions
        .map(serde_json::from_str)
        .transpose()
        .map_err(|err| LedgerError::InvalidInput(format!("instructions are not JSON: {err}")))?
        .unwrap_or(serde_json::Value::Null);
    let request = DelegateRequest::new(RecordId::new(id)?, ActorId::new(to)?, timeout)
        .with_instructions(payload);
    let delegation = ledger.coordinator().delegate(request).await?;
    writeln!(out, "{}", delegation.handle)?;
    Ok(())
}

async fn accept<W: Write>(
    ledger: &FileLedger,
    handle: &str,
    start: bool,
    out: &mut W,
) -> LedgerResult<()> {
    let parsed = parse_handle(handle)?;
    let mut delegation = ledger.coordinator().accept(parsed).await?;
    if start {
        delegation = ledger.coordinator().start(parsed).await?;
    }
    write_delegation(out, &delegation)
}

async fn report<W: Write>(
    ledger: &FileLedger,
    handle: &str,
    outcome: OutcomeArg,
    message: Option<String>,
    confidence: Option<f64>,
    out: &mut W,
) -> LedgerResult<()> {
    let text = message.unwrap_or_default();
    let reported = match outcome {
        OutcomeArg::Completed => Outcome::completed(text),
        OutcomeArg::Failed => Outcome::failed(text),
    };
    let rated = confidence.map(Confidence::new).transpose().map_err(|err| invalid(&err))?;
    let receipt = ledger
        .coordinator()
        .report(parse_handle(handle)?, reported, rated)
        .await?;
    write_receipt(out, &receipt)
}

fn write_receipt<W: Write>(out: &mut W, receipt: &ReportReceipt) -> LedgerResult<()> {
    write_delegation(out, &receipt.delegation)?;
    let task = &receipt.delegation.task_id;
    match &receipt.advancement {
        Advancement::Advanced { from, to } => writeln!(out, "{task}: {from} -> {to}")?,
        Advancement::AwaitingReview(findings) => {
            writeln!(out, "{task}: awaiting review")?;
            write_findings(out, findings)?;
        }
        Advancement::Blocked(err) => {
            writeln!(out, "{task}: not advanced: {err}")?;
            if let LifecycleError::ValidationBlocked { findings, .. } = err {
                write_findings(out, findings)?;
            }
        }
        Advancement::Unchanged => {}
    }
    Ok(())
}

async fn status<W: Write>(ledger: &FileLedger, id: &str, out: &mut W) -> LedgerResult<()> {
    let record_id = RecordId::new(id)?;
    let record = ledger.store().get(&record_id).await?;
    let delegations = ledger.coordinator().list_for_task(&record_id).await?;

    writeln!(out, "id: {}", record.id())?;
    writeln!(out, "title: {}", record.title())?;
    writeln!(out, "kind: {}", record.kind())?;
    writeln!(out, "status: {}", record.status().label())?;
    writeln!(out, "priority: {}", record.priority())?;
    writeln!(out, "parent: {}", or_dash(record.parent()))?;
    writeln!(out, "depends_on: {}", joined(record.depends_on()))?;
    writeln!(out, "tags: {}", joined(record.tags()))?;
    writeln!(out, "assigned_to: {}", or_dash(record.assigned_to()))?;
    writeln!(out, "revision: {}", record.revision())?;
    writeln!(out, "updated_at: {}", record.updated_at().to_rfc3339())?;
    if delegations.is_empty() {
        return Ok(());
    }
    writeln!(out, "delegations:")?;
    for delegation in &delegations {
        writeln!(
            out,
            "  {} {} {} deadline {}",
            delegation.handle,
            delegation.to_actor,
            delegation.state,
            delegation.deadline.to_rfc3339()
        )?;
    }
    Ok(())
}

async fn list<W: Write>(ledger: &FileLedger, args: &ListArgs, out: &mut W) -> LedgerResult<()> {
    let records = ledger.store().find(&query_from(args)?).await?;
    for record in &records {
        writeln!(
            out,
            "{}\t{}\t{}\t{}",
            record.id(),
            record.status(),
            record.priority(),
            record.title()
        )?;
    }
    Ok(())
}

pub(crate) fn query_from(args: &ListArgs) -> LedgerResult<RecordQuery> {
    let mut query = RecordQuery::new();
    if let Some(kind) = args.kind.as_deref() {
        query = query.with_kind(RecordKind::try_from(kind).map_err(|err| invalid(&err))?);
    }
    if let Some(status) = args.status.as_deref() {
        query = query.with_status(RecordStatus::try_from(status).map_err(|err| invalid(&err))?);
    }
    if let Some(tag) = args.tag.as_deref() {
        query = query.with_tag(tag);
    }
    if let Some(assignee) = args.assignee.as_deref() {
        query = query.with_assignee(assignee);
    }
    if let Some(parent) = args.parent.as_deref() {
        query = query.with_parent(RecordId::new(parent)?);
    }
    Ok(query)
}

async fn check<W: Write>(ledger: &FileLedger, out: &mut W) -> LedgerResult<()> {
    for expired in ledger.coordinator().expire_overdue().await? {
        writeln!(
            out,
            "timed out: {} ({} to {})",
            expired.handle, expired.task_id, expired.to_actor
        )?;
    }
    let unreadable = ledger.store().repository().unreadable_documents();
    for document in unreadable {
        writeln!(out, "unreadable: {}: {}", document.path, document.error)?;
    }
    let warnings = ledger.store().integrity_report().await?;
    for warning in &warnings {
        writeln!(out, "warning: {warning}")?;
    }

    let problems = unreadable.len() + warnings.len();
    if problems > 0 {
        error!(problems, "ledger integrity check failed");
        return Err(LedgerError::Integrity { problems });
    }
    writeln!(out, "ok")?;
    Ok(())
}

fn write_delegation<W: Write>(out: &mut W, delegation: &Delegation) -> LedgerResult<()> {
    writeln!(
        out,
        "{} {} {} {}",
        delegation.handle, delegation.task_id, delegation.to_actor, delegation.state
    )?;
    Ok(())
}

fn write_findings<W: Write>(out: &mut W, findings: &[Finding]) -> LedgerResult<()> {
    for finding in findings {
        writeln!(out, "  {finding}")?;
    }
    Ok(())
}

fn parse_ids(raw: &[String]) -> LedgerResult<Vec<RecordId>> {
    raw.iter()
        .map(|value| RecordId::new(value.as_str()).map_err(LedgerError::from))
        .collect()
}

fn parse_priority(raw: &str) -> LedgerResult<Priority> {
    Priority::try_from(raw).map_err(|err| invalid(&err))
}

fn parse_handle(raw: &str) -> LedgerResult<DelegationHandle> {
    raw.parse::<DelegationHandle>().map_err(|err| invalid(&err))
}

fn invalid(err: &impl Display) -> LedgerError {
    LedgerError::InvalidInput(err.to_string())
}

fn or_dash(value: Option<impl Display>) -> String {
    value.map_or_else(|| "-".to_owned(), |present| present.to_string())
}

fn joined<T: Display>(values: impl IntoIterator<Item = T>) -> String {
    let parts: Vec<String> = values.into_iter().map(|value| value.to_string()).collect();
    if parts.is_empty() {
        "-".to_owned()
    } else {
        parts.join(", ")
    }
}
