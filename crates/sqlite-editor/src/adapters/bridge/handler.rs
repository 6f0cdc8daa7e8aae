use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::{
    core::{
        editor::SaveOutcome,
        feedback::Notice,
        render,
        session::{check_file_name, Session, Settings},
    },
    error::{AppError, AppResult},
};

use super::protocol::*;

/// Successful command output: response data plus an optional notice.
struct Reply {
    data: serde_json::Value,
    notice: Option<Notice>,
}

impl Reply {
    fn new<T: Serialize>(data: T) -> AppResult<Self> {
        Ok(Self {
            data: serde_json::to_value(data)?,
            notice: None,
        })
    }

    fn with_notice(mut self, notice: Notice) -> Self {
        self.notice = Some(notice);
        self
    }
}

pub struct BridgeHandler {
    settings: Settings,
    session: Option<Session>,
}

impl BridgeHandler {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            session: None,
        }
    }

    /// Loads a file given on the command line before the first request.
    pub async fn preload(&mut self, path: &Path) -> AppResult<()> {
        let payload = OpenPayload {
            path: Some(path.to_string_lossy().into_owned()),
            name: None,
            bytes_base64: None,
        };
        self.handle_open(payload).await.map(|_| ())
    }

    pub async fn handle(&mut self, req: BridgeRequest) -> BridgeResponse<serde_json::Value> {
        if req.v != PROTOCOL_VERSION {
            return BridgeResponse::err(
                req.v,
                req.id,
                "INVALID_REQUEST",
                format!("unsupported protocol version: {}", req.v),
                None,
            );
        }

        let BridgeRequest { v, id, cmd, payload } = req;
        let result = match cmd.as_str() {
            "open" => match parse(payload) {
                Ok(p) => self.handle_open(p).await,
                Err(e) => Err(e),
            },
            "close" => self.handle_close(),
            "tables" => parse(payload).and_then(|p| self.handle_tables(p)),
            "select" => parse(payload).and_then(|p| self.handle_select(p)),
            "reload" => parse(payload).and_then(|p| self.handle_reload(p)),
            "tab" => parse(payload).and_then(|p| self.handle_tab(p)),
            "open_insert" => self.handle_open_insert(),
            "open_edit" => parse(payload).and_then(|p| self.handle_open_edit(p)),
            "save" => parse(payload).and_then(|p| self.handle_save(p)),
            "cancel" => self.handle_cancel(),
            "delete" => parse(payload).and_then(|p| self.handle_delete(p)),
            "export" => match parse(payload) {
                Ok(p) => self.handle_export(p).await,
                Err(e) => Err(e),
            },
            other => Err(AppError::InvalidRequest(format!("unknown cmd: {other}"))),
        };

        match result {
            Ok(reply) => BridgeResponse::ok(v, id, reply.data, reply.notice),
            Err(e) => {
                tracing::warn!(cmd = %cmd, code = e.code(), error = %e, "command failed");
                let notice = Notice::from_error(action_label(&cmd), &e);
                BridgeResponse::err(v, id, e.code(), e.to_string(), Some(notice))
            }
        }
    }

    async fn handle_open(&mut self, p: OpenPayload) -> AppResult<Reply> {
        let (name, bytes) = match (p.path, p.bytes_base64) {
            (Some(path), _) => {
                let path = PathBuf::from(path);
                let name = p
                    .name
                    .or_else(|| path.file_name().map(|n| n.to_string_lossy().into_owned()))
                    .unwrap_or_default();
                check_file_name(&name)?;
                (name, tokio::fs::read(&path).await?)
            }
            (None, Some(encoded)) => {
                let name = p
                    .name
                    .ok_or_else(|| AppError::InvalidRequest("name is required with bytes_base64".into()))?;
                check_file_name(&name)?;
                let bytes = STANDARD
                    .decode(encoded.as_bytes())
                    .map_err(|e| AppError::InvalidRequest(format!("invalid base64: {e}")))?;
                (name, bytes)
            }
            (None, None) => {
                return Err(AppError::InvalidRequest("open needs path or bytes_base64".into()));
            }
        };

        let session = Session::open(&name, &bytes, self.settings)?;
        let session = self.session.insert(session);
        Reply::new(SessionView {
            file_name: session.file_name(),
            tables: session.tables(),
            tables_html: render::table_list(session.tables(), session.search(), None),
        })
        .map(|r| r.with_notice(Notice::success("Database loaded")))
    }

    fn handle_close(&mut self) -> AppResult<Reply> {
        let closed = self.session.take().ok_or(AppError::NoSession)?;
        tracing::info!(file = closed.file_name(), "database closed");
        Reply::new(true).map(|r| r.with_notice(Notice::info("Database closed")))
    }

    fn handle_tables(&mut self, p: TablesPayload) -> AppResult<Reply> {
        let session = self.session_mut()?;
        if let Some(query) = p.query {
            session.set_search(&query);
        } else {
            session.refresh_tables()?;
        }
        let active = session.selection().map(|s| s.table.as_str());
        Reply::new(TablesView {
            query: session.search(),
            tables: crate::core::browser::filter(session.tables(), session.search()),
            tables_html: render::table_list(session.tables(), session.search(), active),
        })
    }

    fn handle_select(&mut self, p: SelectPayload) -> AppResult<Reply> {
        let session = self.session_mut()?;
        session.select_table(&p.table)?;
        selection_reply(session)
    }

    fn handle_reload(&mut self, p: ReloadPayload) -> AppResult<Reply> {
        let limit = p.limit.as_ref().map(LimitArg::to_row_limit).transpose()?;
        let session = self.session_mut()?;
        session.reload(limit)?;
        session.refresh_tables()?;
        selection_reply(session)
    }

    fn handle_tab(&mut self, p: TabPayload) -> AppResult<Reply> {
        let session = self.session_mut()?;
        session.set_tab(p.tab)?;
        selection_reply(session)
    }

    fn handle_open_insert(&mut self) -> AppResult<Reply> {
        let session = self.session_mut()?;
        session.open_insert()?;
        editor_reply(session)
    }

    fn handle_open_edit(&mut self, p: EditPayload) -> AppResult<Reply> {
        let session = self.session_mut()?;
        session.open_edit(&p.key)?;
        editor_reply(session)
    }

    fn handle_cancel(&mut self) -> AppResult<Reply> {
        let session = self.session_mut()?;
        session.cancel_edit();
        editor_reply(session)
    }

    fn handle_save(&mut self, p: SavePayload) -> AppResult<Reply> {
        let session = self.session_mut()?;
        let saved = session.save(&p.values)?;
        let notice = match (&saved.refresh_error, saved.outcome) {
            (Some(e), outcome) => stale_view(outcome.message(), e),
            (None, SaveOutcome::NothingToUpdate) => Notice::warning(SaveOutcome::NothingToUpdate.message()),
            (None, outcome) => Notice::success(outcome.message()),
        };
        selection_reply(session).map(|r| r.with_notice(notice))
    }

    fn handle_delete(&mut self, p: DeletePayload) -> AppResult<Reply> {
        let session = self.session_mut()?;
        let deleted = session.delete(&p.key, p.confirmed)?;
        let notice = match &deleted {
            Some(done) => match &done.refresh_error {
                Some(e) => stale_view("Row deleted", e),
                None => Notice::success("Row deleted"),
            },
            None => Notice::warning("Delete not confirmed; nothing was removed"),
        };
        let deleted = deleted.map(|done| done.outcome);
        Reply::new(DeleteView { deleted }).map(|r| r.with_notice(notice))
    }

    async fn handle_export(&mut self, p: ExportPayload) -> AppResult<Reply> {
        let session = self.session.as_ref().ok_or(AppError::NoSession)?;
        let bytes = session.export()?;
        let file_name = session.file_name().to_string();
        let view = match p.path {
            Some(path) => {
                tokio::fs::write(&path, &bytes).await?;
                ExportView {
                    file_name,
                    size: bytes.len(),
                    path: Some(path),
                    bytes_base64: None,
                }
            }
            None => ExportView {
                file_name,
                size: bytes.len(),
                path: None,
                bytes_base64: Some(STANDARD.encode(&bytes)),
            },
        };
        Reply::new(view).map(|r| r.with_notice(Notice::success("Database exported")))
    }

    fn session_mut(&mut self) -> AppResult<&mut Session> {
        self.session.as_mut().ok_or(AppError::NoSession)
    }
}

fn parse<T: DeserializeOwned>(payload: serde_json::Value) -> AppResult<T> {
    let payload = if payload.is_null() {
        serde_json::Value::Object(Default::default())
    } else {
        payload
    };
    serde_json::from_value(payload).map_err(|e| AppError::InvalidRequest(e.to_string()))
}

/// The write went through; only the follow-up reload failed.
fn stale_view(done: &str, e: &AppError) -> Notice {
    Notice::warning(format!("{done}, but the view could not be refreshed: {e}"))
}

fn selection_reply(session: &Session) -> AppResult<Reply> {
    let selection = session
        .selection()
        .ok_or_else(|| AppError::Internal("selection missing after load".into()))?;
    Reply::new(SelectionView {
        table: &selection.table,
        tab: selection.tab,
        columns: &selection.columns,
        page: &selection.page,
        grid_html: render::grid(&selection.page),
        structure_html: render::structure(&selection.columns),
        tables_html: render::table_list(session.tables(), session.search(), Some(selection.table.as_str())),
    })
}

fn editor_reply(session: &Session) -> AppResult<Reply> {
    Reply::new(EditorView {
        editor: session.editor_state(),
        form_html: render::form(session.editor_state()),
    })
}

fn action_label(cmd: &str) -> &'static str {
    match cmd {
        "open" => "Loading the database",
        "select" | "reload" | "tab" => "Loading the table",
        "tables" => "Refreshing tables",
        "open_insert" | "open_edit" => "Opening the editor",
        "save" => "Saving the row",
        "delete" => "Deleting the row",
        "export" => "Exporting the database",
        _ => "Request",
    }
}
