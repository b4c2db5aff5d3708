//! Command handlers: one function (or a small group) per row of spec.md
//! §4.7's command reference table, following the teacher crate's
//! `server/controlchan/commands/*.rs` — one handler per command — but
//! collapsed into plain async functions rather than a `CommandHandler`
//! trait object per command, since this crate's dispatcher is the static
//! match spec.md §9 asks for rather than the teacher's per-command type
//! registered into a `HashMap<&str, Box<dyn CommandHandler>>`.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use futures_util::SinkExt;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;

use crate::auth::Permission;
use crate::config::Config;
use crate::storage::{ObjectStore, WriteMode};

use super::accountant::ConnectionAccountant;
use super::command::Command;
use super::datachan::{self, PasvOutcome};
use super::error::{FtpError, FtpErrorKind};
use super::listing::{self, EntryKind};
use super::portpool::PortPool;
use super::reply::{Reply, ReplyCode, ReplyCodec};
use super::session::{Fact, Session, TransferType};
use super::transfer::{self, TransferOutcome};

/// Read-only context shared by every session on this server, following
/// `server/ftpserver/options.rs`'s `OptionsHolder` (the per-listen bundle
/// of settings every spawned control-channel loop is handed).
pub(crate) struct Shared<S: ObjectStore> {
    pub storage: Arc<S>,
    pub config: Arc<Config>,
    pub accountant: Arc<ConnectionAccountant>,
    pub port_pool: Arc<PortPool>,
}

/// Commands the dispatcher allows before login: `USER`/`PASS`/`QUIT`, and
/// nothing else (spec.md §4.2: "Pre-login, only `USER`, `PASS`, `QUIT` are
/// allowed; anything else ⇒ `530`"; testable invariant 7 in spec.md §8).
/// This overrides spec.md §4.7's per-command "Auth required: no" marking
/// on `FEAT`/`OPTS UTF8` — the original (`if self.user is None and cmd not
/// in ('USER','PASS','QUIT'): send_status(530)`) and §4.2/§8 agree on the
/// stricter rule, so those two commands are rejected pre-login too.
fn allowed_pre_login(command: &Command) -> bool {
    matches!(command, Command::User { .. } | Command::Pass { .. } | Command::Quit)
}

/// Whether a command name should leave `rest_offset` alone across the
/// clear-before-dispatch step (spec.md §3: "cleared after each transfer or
/// after any command other than RETR/STOR"). `REST` itself sets a fresh
/// value inside its own handler, so it is also exempted here rather than
/// being cleared then immediately re-set.
fn preserves_rest_offset(command: &Command) -> bool {
    matches!(command, Command::Rest { .. } | Command::Retr { .. } | Command::Stor { .. } | Command::Appe { .. })
}

/// Dispatches one parsed command against `session`, returning the reply to
/// send and whether the control connection should close afterward.
///
/// Mirrors spec.md §4.2's handler-exception contract: any [`FtpError`]
/// surfaced by a handler is turned into the reply its kind maps to, and
/// `rest_offset`/`pending_rename_from` are cleared — the Rust analogue of
/// the source's blanket `except Exception` around every `ftp_*` call.
pub(crate) async fn dispatch<S: ObjectStore + 'static>(
    shared: &Shared<S>,
    session: &mut Session,
    ctrl: &mut Framed<TcpStream, ReplyCodec>,
    local_addr: SocketAddr,
    command: Command,
) -> (Reply, bool) {
    if !session.is_authenticated() && !allowed_pre_login(&command) {
        return (Reply::new(ReplyCode::NotLoggedIn, "Please login with USER and PASS."), false);
    }

    if !preserves_rest_offset(&command) {
        session.clear_rest_offset();
    }

    let result = run(shared, session, ctrl, local_addr, command).await;
    match result {
        Ok(Outcome::Reply(reply)) => (reply, false),
        Ok(Outcome::Close(reply)) => (reply, true),
        Err(err) => {
            session.clear_rest_offset();
            session.clear_pending_rename();
            tracing::warn!(kind = %err.kind(), "command handler failed");
            (Reply::new(err.reply_code(), err.kind().to_string()), false)
        }
    }
}

enum Outcome {
    Reply(Reply),
    Close(Reply),
}

fn ok(reply: Reply) -> Result<Outcome, FtpError> {
    Ok(Outcome::Reply(reply))
}

async fn run<S: ObjectStore + 'static>(
    shared: &Shared<S>,
    session: &mut Session,
    ctrl: &mut Framed<TcpStream, ReplyCodec>,
    local_addr: SocketAddr,
    command: Command,
) -> Result<Outcome, FtpError> {
    match command {
        Command::User { username } => user(shared, session, username),
        Command::Pass { password } => pass(shared, session, password),
        Command::Quit => Ok(Outcome::Close(Reply::new(ReplyCode::ClosingControlConnection, "Goodbye."))),
        Command::Pwd => pwd(session),
        Command::Cwd { path } => cwd(shared, session, &path).await,
        Command::Cdup => cwd(shared, session, "..").await,
        Command::Type { param } => type_(session, &param),
        Command::Mode { param } => mode(&param),
        Command::Stru { param } => stru(&param),
        Command::Pasv => pasv(shared, session, local_addr).await,
        Command::Port { addr } => port(shared, session, addr).await,
        Command::Rest { offset } => rest(session, offset),
        Command::Retr { path } => retr(shared, session, ctrl, &path).await,
        Command::Stor { path } => stor(shared, session, ctrl, &path, false).await,
        Command::Appe { path } => stor(shared, session, ctrl, &path, true).await,
        Command::Dele { path } => dele(shared, session, &path).await,
        Command::Rnfr { path } => rnfr(shared, session, &path).await,
        Command::Rnto { path } => rnto(shared, session, &path).await,
        Command::Mkd { path } => mkd(shared, session, &path).await,
        Command::Rmd { path } => rmd(shared, session, &path).await,
        Command::List { path } => list(shared, session, ctrl, path).await,
        Command::Size { path } => size(shared, session, &path).await,
        Command::Syst => syst(shared),
        Command::Noop => ok(Reply::new(ReplyCode::CommandOkay, "NOOP command successful.")),
        Command::Feat => feat(shared),
        Command::OptsUtf8 { on } => opts_utf8(session, on),
        Command::OptsMlst { facts } => opts_mlst(session, &facts),
        Command::OptsUnknown => ok(Reply::new(ReplyCode::ParameterSyntaxError, "Unsupported OPTS parameter.")),
        Command::Mlst { path } => mlst(shared, session, path).await,
        Command::Mlsd { path } => mlsd(shared, session, ctrl, path).await,
        Command::Help => ok(Reply::new(ReplyCode::HelpMessage, "Help not available.")),
        Command::Stat => ok(Reply::new(ReplyCode::SystemStatus, "Server status OK.")),
        Command::Acct => ok(Reply::new(ReplyCode::CommandNotImplemented, "ACCT not implemented.")),
        Command::Unknown { name } => ok(Reply::new(ReplyCode::CommandNotImplemented, format!("Command \"{name}\" not implemented."))),
    }
}

fn user<S: ObjectStore>(shared: &Shared<S>, session: &mut Session, username: String) -> Result<Outcome, FtpError> {
    session.username = Some(username.clone());
    match shared.config.user(&username) {
        Some(user) => {
            let message = user.loginmsg.clone().unwrap_or_else(|| format!("User {username} OK. Password required."));
            ok(Reply::new(ReplyCode::NeedPassword, message))
        }
        None => ok(Reply::new(ReplyCode::AuthFailed, "Invalid user name.")),
    }
}

fn pass<S: ObjectStore>(shared: &Shared<S>, session: &mut Session, password: String) -> Result<Outcome, FtpError> {
    let Some(username) = session.username.clone() else {
        return ok(Reply::new(ReplyCode::NeedAccount, "Login with USER first."));
    };
    let Some(user) = shared.config.user(&username) else {
        return ok(Reply::new(ReplyCode::AuthFailed, "Invalid user name."));
    };
    let given = if password.is_empty() { None } else { Some(password.as_str()) };
    if user.check_password(given) {
        session.user = Some(user.clone());
        ok(Reply::new(ReplyCode::UserLoggedIn, "User logged in, proceed."))
    } else {
        ok(Reply::new(ReplyCode::AuthFailed, "Login incorrect."))
    }
}

fn pwd(session: &mut Session) -> Result<Outcome, FtpError> {
    ok(Reply::new(ReplyCode::PathCreated, format!("\"{}\" is current directory.", session.directory)))
}

/// `CWD`/`CDUP` share this implementation (spec.md §4.7: "CDUP ... is
/// equivalent to CWD `..`").
async fn cwd<S: ObjectStore>(shared: &Shared<S>, session: &mut Session, arg: &str) -> Result<Outcome, FtpError> {
    if session.directory == "/" && arg.trim() == ".." {
        return ok(Reply::new(ReplyCode::FileError, "\"/\" has no parent directory."));
    }

    let resolved = session.resolve(arg);
    if !resolved.attrs.permission.contains(Permission::ENTER) {
        return Err(FtpErrorKind::PermissionDenied.into());
    }
    let meta = shared.storage.stat(&resolved.realpath).await?;
    if !meta.is_dir {
        return Err(FtpErrorKind::NotFound.into());
    }
    session.directory = resolved.path.clone();
    ok(Reply::new(ReplyCode::FileActionOkay, format!("\"{}\" is current directory.", resolved.path)))
}

fn type_(session: &mut Session, param: &str) -> Result<Outcome, FtpError> {
    match param.trim().to_ascii_uppercase().as_str() {
        "I" => {
            session.transfer_type = TransferType::Binary;
            ok(Reply::new(ReplyCode::CommandOkay, "Switching to Binary mode."))
        }
        "A" => {
            session.transfer_type = TransferType::Ascii;
            ok(Reply::new(ReplyCode::CommandOkay, "Switching to ASCII mode."))
        }
        _ => Err(FtpErrorKind::UnsupportedParameter.into()),
    }
}

fn mode(param: &str) -> Result<Outcome, FtpError> {
    if param.trim().eq_ignore_ascii_case("S") {
        ok(Reply::new(ReplyCode::CommandOkay, "Mode set to S."))
    } else {
        Err(FtpErrorKind::UnsupportedParameter.into())
    }
}

fn stru(param: &str) -> Result<Outcome, FtpError> {
    if param.trim().eq_ignore_ascii_case("F") {
        ok(Reply::new(ReplyCode::CommandOkay, "Structure set to F."))
    } else {
        Err(FtpErrorKind::UnsupportedParameter.into())
    }
}

async fn pasv<S: ObjectStore>(shared: &Shared<S>, session: &mut Session, local_addr: SocketAddr) -> Result<Outcome, FtpError> {
    let outcome = datachan::start_passive(shared.port_pool.clone(), local_addr.ip())
        .await
        .map_err(|err| FtpError::with_source(FtpErrorKind::ResourceExhausted, err))?;
    match outcome {
        PasvOutcome::Listening { transporter, octets, port } => {
            session.set_transporter(transporter);
            let [a, b, c, d] = octets;
            ok(Reply::new(
                ReplyCode::EnteringPassiveMode,
                format!("Entering Passive Mode ({a},{b},{c},{d},{},{}).", port >> 8, port & 0xff),
            ))
        }
        // spec.md §4.4/§4.8: "Port-lease unavailable within 1 s ⇒ `500`",
        // following `ftpd.py`'s `ftp_PASV` (`except TimeoutError:
        // send_status(500)`) — built directly rather than through
        // `FtpErrorKind::ResourceExhausted`, which also covers `421`/`530`
        // for other resource-exhaustion cases (spec.md §7).
        PasvOutcome::NoPortAvailable => ok(Reply::new(ReplyCode::CommandSyntaxError, "No data port available.")),
    }
}

async fn port<S: ObjectStore>(shared: &Shared<S>, session: &mut Session, addr: (u8, u8, u8, u8, u16)) -> Result<Outcome, FtpError> {
    match datachan::start_active(addr, datachan::CONNECT_TIMEOUT).await {
        Ok(Some(transporter)) => {
            session.set_transporter(transporter);
            ok(Reply::new(ReplyCode::CommandOkay, "PORT command successful."))
        }
        Ok(None) => Err(FtpErrorKind::Timeout.into()),
        Err(err) => Err(FtpError::with_source(FtpErrorKind::Timeout, err)),
    }
}

fn rest(session: &mut Session, offset: u64) -> Result<Outcome, FtpError> {
    if offset == u64::MAX {
        // spec.md §4.7: "Non-integer ⇒ `501`", following `ftpd.py`'s
        // `ftp_REST` (`except ValueError: send_status(501)`).
        return ok(Reply::new(ReplyCode::ParameterSyntaxError, "REST requires an integer offset."));
    }
    session.rest_offset = Some(offset);
    ok(Reply::new(ReplyCode::FileActionPending, format!("Restarting at {offset}. Send RETR/STOR to initiate transfer.")))
}

async fn retr<S: ObjectStore + 'static>(
    shared: &Shared<S>,
    session: &mut Session,
    ctrl: &mut Framed<TcpStream, ReplyCodec>,
    path: &str,
) -> Result<Outcome, FtpError> {
    let resolved = session.resolve(path);
    if !resolved.attrs.permission.contains(Permission::RETRIEVE) {
        return Err(FtpErrorKind::PermissionDenied.into());
    }
    let meta = shared.storage.stat(&resolved.realpath).await?;
    if !meta.is_file {
        return Err(FtpErrorKind::NotFound.into());
    }

    let offset = session.rest_offset.take().unwrap_or(0);
    let Some(mut transporter) = session.transporter.take() else {
        return Err(FtpErrorKind::BadSequence.into());
    };
    let stream = match datachan::acquire_stream(ctrl, &mut transporter).await {
        Ok(stream) => stream,
        Err(reply) => return ok(reply),
    };

    let source = shared.storage.open_read(&resolved.realpath, offset).await?;
    let outcome = transfer::push(stream, source, shared.config.buf_out, resolved.attrs.max_down, shared.config.data_timeout).await;
    ok(reply_for_transfer(outcome))
}

async fn stor<S: ObjectStore + 'static>(
    shared: &Shared<S>,
    session: &mut Session,
    ctrl: &mut Framed<TcpStream, ReplyCodec>,
    path: &str,
    append: bool,
) -> Result<Outcome, FtpError> {
    let resolved = session.resolve(path);
    let required = if append { Permission::APPEND } else { Permission::WRITE };
    if !resolved.attrs.permission.contains(required) {
        return Err(FtpErrorKind::PermissionDenied.into());
    }

    let offset = session.rest_offset.take();
    let Some(mut transporter) = session.transporter.take() else {
        return Err(FtpErrorKind::BadSequence.into());
    };
    let stream = match datachan::acquire_stream(ctrl, &mut transporter).await {
        Ok(stream) => stream,
        Err(reply) => return ok(reply),
    };

    let mode = if append {
        WriteMode::Append
    } else {
        match offset {
            Some(offset) if offset > 0 => WriteMode::Resume(offset),
            _ => WriteMode::Create,
        }
    };
    let sink = shared.storage.open_write(&resolved.realpath, mode).await?;
    let ascii = session.transfer_type == TransferType::Ascii;
    let outcome = transfer::pull(stream, sink, shared.config.buf_in, resolved.attrs.max_up, shared.config.data_timeout, ascii).await;
    ok(reply_for_transfer(outcome))
}

fn reply_for_transfer(outcome: TransferOutcome) -> Reply {
    match outcome {
        TransferOutcome::Completed => Reply::new(ReplyCode::ClosingDataConnection, "Transfer complete."),
        TransferOutcome::TimedOut => Reply::new(ReplyCode::ServiceNotAvailable, "Data connection timed out."),
        TransferOutcome::Failed => Reply::new(ReplyCode::ConnectionClosed, "Connection closed; transfer aborted."),
    }
}

async fn dele<S: ObjectStore>(shared: &Shared<S>, session: &mut Session, path: &str) -> Result<Outcome, FtpError> {
    let resolved = session.resolve(path);
    if !resolved.attrs.permission.contains(Permission::DELETE) {
        return Err(FtpErrorKind::PermissionDenied.into());
    }
    shared.storage.remove_file(&resolved.realpath).await?;
    ok(Reply::new(ReplyCode::FileActionOkay, "DELE command successful."))
}

async fn rnfr<S: ObjectStore>(shared: &Shared<S>, session: &mut Session, path: &str) -> Result<Outcome, FtpError> {
    let resolved = session.resolve(path);
    if !resolved.attrs.permission.contains(Permission::RENAME) {
        return Err(FtpErrorKind::PermissionDenied.into());
    }
    if resolved.path == "/" {
        return Err(FtpErrorKind::NotFound.into());
    }
    shared.storage.stat(&resolved.realpath).await?;
    session.pending_rename_from = Some(resolved.realpath);
    ok(Reply::new(ReplyCode::FileActionPending, "File exists, ready for destination name."))
}

async fn rnto<S: ObjectStore>(shared: &Shared<S>, session: &mut Session, path: &str) -> Result<Outcome, FtpError> {
    let Some(from) = session.pending_rename_from.take() else {
        return Err(FtpErrorKind::BadSequence.into());
    };
    let resolved = session.resolve(path);
    if !resolved.attrs.permission.contains(Permission::RENAME) {
        return Err(FtpErrorKind::PermissionDenied.into());
    }
    shared.storage.rename(&from, &resolved.realpath).await?;
    ok(Reply::new(ReplyCode::FileActionOkay, "RNTO command successful."))
}

async fn mkd<S: ObjectStore>(shared: &Shared<S>, session: &mut Session, path: &str) -> Result<Outcome, FtpError> {
    let resolved = session.resolve(path);
    if !resolved.attrs.permission.contains(Permission::MAKE_DIR) {
        return Err(FtpErrorKind::PermissionDenied.into());
    }
    shared.storage.mkdir(&resolved.realpath).await?;
    ok(Reply::new(ReplyCode::PathCreated, format!("\"{}\" created.", resolved.path)))
}

async fn rmd<S: ObjectStore>(shared: &Shared<S>, session: &mut Session, path: &str) -> Result<Outcome, FtpError> {
    let resolved = session.resolve(path);
    if !resolved.attrs.permission.contains(Permission::DELETE) {
        return Err(FtpErrorKind::PermissionDenied.into());
    }
    if resolved.path == "/" {
        return Err(FtpErrorKind::PermissionDenied.into());
    }
    shared.storage.remove_dir_all(&resolved.realpath).await?;
    ok(Reply::new(ReplyCode::FileActionOkay, "RMD command successful."))
}

async fn list<S: ObjectStore + 'static>(
    shared: &Shared<S>,
    session: &mut Session,
    ctrl: &mut Framed<TcpStream, ReplyCodec>,
    path: Option<String>,
) -> Result<Outcome, FtpError> {
    let arg = path.as_deref().unwrap_or(".");
    let resolved = session.resolve(arg);
    if !resolved.attrs.permission.contains(Permission::LIST) {
        return Err(FtpErrorKind::PermissionDenied.into());
    }
    let meta = shared.storage.stat(&resolved.realpath).await?;

    if meta.is_file {
        let name = Path::new(&resolved.path).file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or(resolved.path.clone());
        return ok(Reply::new(ReplyCode::FileStatus, format!("{} {}", meta.len, name)));
    }

    let Some(mut transporter) = session.transporter.take() else {
        return Err(FtpErrorKind::BadSequence.into());
    };
    let stream = match datachan::acquire_stream(ctrl, &mut transporter).await {
        Ok(stream) => stream,
        Err(reply) => return ok(reply),
    };

    let entries = shared.storage.list_dir(&resolved.realpath).await?;
    let now = chrono::Utc::now();
    let payload = listing::render_list(entries, now);
    let outcome = transfer::push(stream, &payload[..], shared.config.buf_out, resolved.attrs.max_down, shared.config.data_timeout).await;
    ok(reply_for_transfer(outcome))
}

async fn size<S: ObjectStore>(shared: &Shared<S>, session: &mut Session, path: &str) -> Result<Outcome, FtpError> {
    let resolved = session.resolve(path);
    let meta = shared.storage.stat(&resolved.realpath).await?;
    if !meta.is_file {
        // spec.md §4.7: "`213 <size>` for regular files; else `501`",
        // following `ftpd.py`'s `ftp_SIZE` (`send_status(501)` for
        // anything that isn't a plain file).
        return ok(Reply::new(ReplyCode::ParameterSyntaxError, "SIZE not allowed in ASCII mode or not a plain file."));
    }
    ok(Reply::new(ReplyCode::FileStatus, meta.len.to_string()))
}

/// `215 UNIX <platform> <server-name>` (spec.md §4.7), following
/// `ftpd.py`'s `ftp_SYST` (`'UNIX ' + platform.system() + ' ' + SERVER_NAME`).
fn syst<S: ObjectStore>(shared: &Shared<S>) -> Result<Outcome, FtpError> {
    let platform = match std::env::consts::OS {
        "linux" => "Linux",
        "macos" => "Darwin",
        "windows" => "Windows",
        other => other,
    };
    ok(Reply::new(ReplyCode::SystemType, format!("UNIX {platform} {}", shared.config.server_name)))
}

fn feat<S: ObjectStore>(shared: &Shared<S>) -> Result<Outcome, FtpError> {
    let mut lines = vec!["Features:".to_string()];
    lines.extend(shared.config.features.iter().cloned());
    lines.push("END".to_string());
    ok(Reply::multiline(ReplyCode::SystemStatus, lines))
}

fn opts_utf8(session: &mut Session, on: bool) -> Result<Outcome, FtpError> {
    session.utf8_explicit = on;
    ok(Reply::new(ReplyCode::CommandOkay, if on { "UTF8 set to on." } else { "UTF8 set to off." }))
}

fn opts_mlst(session: &mut Session, facts: &str) -> Result<Outcome, FtpError> {
    let parsed: Vec<Fact> = facts.split(';').filter_map(|name| if name.is_empty() { None } else { Fact::parse(name) }).collect();
    session.mlst_facts = if parsed.is_empty() { Fact::all() } else { parsed };
    let accepted: String = session.mlst_facts.iter().map(|f| format!("{};", f.name())).collect();
    ok(Reply::new(ReplyCode::CommandOkay, format!("MLST OPTS {accepted}")))
}

async fn mlst<S: ObjectStore>(shared: &Shared<S>, session: &mut Session, path: Option<String>) -> Result<Outcome, FtpError> {
    let arg = path.unwrap_or_else(|| session.directory.clone());
    let resolved = session.resolve(&arg);
    if !resolved.attrs.permission.contains(Permission::LIST) {
        return Err(FtpErrorKind::PermissionDenied.into());
    }
    let meta = shared.storage.stat(&resolved.realpath).await?;
    let kind = if meta.is_dir { EntryKind::Dir } else { EntryKind::File };
    let name = Path::new(&resolved.path).file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_else(|| resolved.path.clone());

    let facts = session.mlst_facts.clone();
    let header = format!("Listing {}: {}", if meta.is_dir { "dir" } else { "file" }, arg);
    let fact_line = listing::format_mlst_entry(&facts, kind, Some(&meta), resolved.attrs.permission, &name);
    ok(Reply::multiline(ReplyCode::FileActionOkay, vec![header, fact_line, "End".to_string()]))
}

async fn mlsd<S: ObjectStore + 'static>(
    shared: &Shared<S>,
    session: &mut Session,
    ctrl: &mut Framed<TcpStream, ReplyCodec>,
    path: Option<String>,
) -> Result<Outcome, FtpError> {
    let arg = path.unwrap_or_else(|| session.directory.clone());
    let resolved = session.resolve(&arg);
    if !resolved.attrs.permission.contains(Permission::LIST) {
        return Err(FtpErrorKind::PermissionDenied.into());
    }
    let dir_meta = shared.storage.stat(&resolved.realpath).await?;
    if !dir_meta.is_dir {
        return Err(FtpErrorKind::NotFound.into());
    }

    let parent_arg = format!("{}/..", resolved.path.trim_end_matches('/'));
    let parent_resolved = session.resolve(&parent_arg);
    let include_parent = parent_resolved.path != resolved.path;
    let parent_meta = if include_parent { shared.storage.stat(&parent_resolved.realpath).await.ok() } else { None };

    let Some(mut transporter) = session.transporter.take() else {
        return Err(FtpErrorKind::BadSequence.into());
    };
    let stream = match datachan::acquire_stream(ctrl, &mut transporter).await {
        Ok(stream) => stream,
        Err(reply) => return ok(reply),
    };

    let entries = shared.storage.list_dir(&resolved.realpath).await?;
    let facts = session.mlst_facts.clone();
    let payload = listing::render_mlsd(
        &facts,
        entries,
        &dir_meta,
        resolved.attrs.permission,
        parent_meta.as_ref(),
        parent_resolved.attrs.permission,
        include_parent,
    );
    let outcome = transfer::push(stream, &payload[..], shared.config.buf_out, resolved.attrs.max_down, shared.config.data_timeout).await;
    ok(reply_for_transfer(outcome))
}

/// Sends a reply over the control channel before the session loop moves on
/// to the next command; used by [`super::command_loop`].
pub(crate) async fn send(ctrl: &mut Framed<TcpStream, ReplyCodec>, reply: Reply) -> std::io::Result<()> {
    ctrl.send(reply).await
}
