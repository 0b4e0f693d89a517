//! Development server implementation.

use std::collections::HashMap;
use std::fs;
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Request, State,
    },
    http::{header, HeaderName, HeaderValue, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tower_http::services::ServeDir;

use aoike_plugin::{PluginContainer, PluginError, ResolvedConfig, ServerContext};
use aoike_static::{
    collect_posts, discover_files, render_categories_page, render_index_page, render_post_page,
    Post, TemplateEngine,
};

use crate::watcher::{FileWatcher, WatchEvent};
use crate::websocket::{
    inject_reload_script, reload_client_script, ReloadHub, ReloadMessage, RELOAD_ENDPOINT,
    RELOAD_SCRIPT,
};

/// Errors that can occur with the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind to {0}: {1}")]
    BindError(String, String),

    #[error("File watch error: {0}")]
    WatchError(String),

    #[error(transparent)]
    Plugin(#[from] PluginError),

    #[error("Server error: {0}")]
    ServeError(String),
}

/// Shared server state.
struct ServerState {
    config: ResolvedConfig,
    plugins: Arc<PluginContainer>,
    templates: TemplateEngine,
    reload: ReloadHub,
    headers: Vec<(HeaderName, HeaderValue)>,

    /// Files under the project root
    root: Mount,

    /// Files under each alias directory, keyed by alias prefix
    aliases: HashMap<String, Mount>,
}

/// A directory served for part of the URL space.
struct Mount {
    dir: PathBuf,
    files: ServeDir,
}

impl Mount {
    fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            files: ServeDir::new(dir),
        }
    }
}

/// Development server.
pub struct DevServer {
    config: ResolvedConfig,
    plugins: Arc<PluginContainer>,
}

/// A bound server, ready to accept connections.
pub struct RunningServer {
    listener: TcpListener,
    app: Router,
    url: String,
}

impl DevServer {
    /// Create a new development server.
    pub fn new(config: ResolvedConfig, plugins: Arc<PluginContainer>) -> Self {
        Self { config, plugins }
    }

    /// Run the `configure_server` hooks, start watching and bind the listener.
    pub async fn listen(self) -> Result<RunningServer, ServerError> {
        let mut context = ServerContext {
            root: self.config.root.clone(),
            ..Default::default()
        };
        self.plugins.configure_server(&mut context)?;

        let headers = context
            .headers
            .iter()
            .filter_map(|(name, value)| {
                match (
                    HeaderName::try_from(name.as_str()),
                    HeaderValue::try_from(value.as_str()),
                ) {
                    (Ok(name), Ok(value)) => Some((name, value)),
                    _ => {
                        tracing::warn!("Ignoring invalid header {}: {}", name, value);
                        None
                    }
                }
            })
            .collect();

        let state = Arc::new(ServerState {
            config: self.config.clone(),
            plugins: Arc::clone(&self.plugins),
            templates: TemplateEngine::new(),
            reload: ReloadHub::new(),
            headers,
            root: Mount::new(&self.config.root),
            aliases: self
                .config
                .aliases
                .iter()
                .map(|alias| (alias.find.clone(), Mount::new(&alias.replacement)))
                .collect(),
        });

        // Set up file watcher
        let mut watch_paths = vec![self.config.root.clone()];
        watch_paths.extend(self.config.aliases.iter().map(|a| a.replacement.clone()));
        watch_paths.extend(context.watch_paths);
        let watch_paths: Vec<PathBuf> = watch_paths.iter().map(|p| absolute(p)).collect();

        let (watcher, mut rx) =
            FileWatcher::new(&watch_paths).map_err(|e| ServerError::WatchError(e.to_string()))?;

        let out_dir = match self.config.out_dir.strip_prefix(&self.config.root) {
            Ok(relative) => absolute(&self.config.root).join(relative),
            Err(_) => absolute(&self.config.out_dir),
        };
        let state_clone = Arc::clone(&state);
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                handle_watch_event(&state_clone, &out_dir, event);
            }
            // Keep watcher alive
            drop(watcher);
        });

        // Build router
        let app = Router::new()
            .route(RELOAD_ENDPOINT, get(ws_handler))
            .route(RELOAD_SCRIPT, get(reload_script_handler))
            .fallback(module_handler)
            .with_state(state);

        let server = &self.config.server;
        let listener = TcpListener::bind((server.host.as_str(), server.port))
            .await
            .map_err(|e| {
                ServerError::BindError(format!("{}:{}", server.host, server.port), e.to_string())
            })?;

        let port = listener
            .local_addr()
            .map_err(|e| ServerError::BindError(server.host.clone(), e.to_string()))?
            .port();
        let url = format!("http://{}:{}{}", server.display_host, port, self.config.base);

        tracing::debug!("Dev server listening on {}", url);

        Ok(RunningServer { listener, app, url })
    }
}

impl RunningServer {
    /// Public URL of the server, including the base path.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        self.listener
            .local_addr()
            .map_err(|e| ServerError::ServeError(e.to_string()))
    }

    /// Serve requests until the process is stopped.
    pub async fn serve(self) -> Result<(), ServerError> {
        axum::serve(self.listener, self.app)
            .await
            .map_err(|e| ServerError::ServeError(e.to_string()))
    }
}

fn absolute(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Handle file watch events.
fn handle_watch_event(state: &ServerState, out_dir: &Path, event: WatchEvent) {
    let path = event.path();
    if path.starts_with(out_dir) {
        return;
    }

    match &event {
        WatchEvent::PostModified(path) => tracing::info!("Post modified: {}", path.display()),
        _ => tracing::debug!("Changed: {}", path.display()),
    }

    state.reload.send(ReloadMessage::Reload);
}

/// Handler for the live reload WebSocket endpoint.
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state))
}

/// Handle a WebSocket connection.
async fn handle_ws(mut socket: WebSocket, state: Arc<ServerState>) {
    let mut rx = state.reload.subscribe();

    if send_message(&mut socket, &ReloadMessage::Connected)
        .await
        .is_err()
    {
        return;
    }

    // Forward reload messages to the client
    while let Ok(msg) = rx.recv().await {
        if send_message(&mut socket, &msg).await.is_err() {
            break;
        }
    }
}

async fn send_message(socket: &mut WebSocket, msg: &ReloadMessage) -> Result<(), ()> {
    let json = serde_json::to_string(msg).map_err(|_| ())?;
    socket
        .send(Message::Text(json.into()))
        .await
        .map_err(|_| ())
}

/// Handler for the live reload client script.
async fn reload_script_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript")],
        reload_client_script(),
    )
}

/// Serve a module, page or raw file for any other request.
async fn module_handler(State(state): State<Arc<ServerState>>, request: Request) -> Response {
    let mut response = match serve_request(&state, request).await {
        Ok(response) => response,
        Err(status) => status.into_response(),
    };

    for (name, value) in &state.headers {
        response.headers_mut().insert(name.clone(), value.clone());
    }
    response
}

async fn serve_request(state: &ServerState, request: Request) -> Result<Response, StatusCode> {
    let (mut parts, body) = request.into_parts();
    let raw_path = parts.uri.path().to_string();

    let decoded = urlencoding::decode(&raw_path).map_err(|_| StatusCode::BAD_REQUEST)?;
    let request_path = strip_base(&decoded, &state.config.base);

    let (mount, relative) = match state.config.split_alias(request_path) {
        Some((alias, rest)) => (
            state.aliases.get(&alias.find).ok_or(StatusCode::NOT_FOUND)?,
            rest,
        ),
        None => (&state.root, request_path.trim_start_matches('/')),
    };

    if !is_contained(relative) {
        tracing::warn!("Rejected path outside the project: {}", raw_path);
        return Err(StatusCode::NOT_FOUND);
    }

    let mut relative = relative.trim_end_matches('/').to_string();
    if mount.dir.join(&relative).is_dir() {
        relative = if relative.is_empty() {
            "index.html".to_string()
        } else {
            format!("{}/index.html", relative)
        };
    }
    let file = mount.dir.join(&relative);
    let at_root = std::ptr::eq(mount, &state.root);

    if !file.exists() {
        if at_root && relative == "index.html" {
            return render_generated_index(state).map(html_response);
        }
        if at_root && relative == "categories.html" {
            return render_generated_categories(state).map(html_response);
        }

        let source = file.with_extension("md");
        if file.extension().is_some_and(|e| e == "html") && source.is_file() {
            return render_post(state, &source).map(html_response);
        }

        tracing::debug!("Not found: {}", raw_path);
        return Err(StatusCode::NOT_FOUND);
    }

    let bytes = fs::read(&file).map_err(|e| {
        tracing::warn!("Failed to read {}: {}", file.display(), e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    if let Ok(code) = std::str::from_utf8(&bytes) {
        let id = file.to_string_lossy();
        let transformed = state.plugins.transform(code, &id).map_err(|e| {
            tracing::warn!("{}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

        if let Some(result) = transformed {
            return Ok((
                [(header::CONTENT_TYPE, "application/javascript")],
                result.code,
            )
                .into_response());
        }

        if file.extension().is_some_and(|e| e == "html") {
            return Ok(html_response(code.to_string()));
        }
    }

    // Untransformed files go to the mount's file service
    parts.uri = encode_path(&relative)
        .parse::<Uri>()
        .map_err(|_| StatusCode::BAD_REQUEST)?;

    match mount
        .files
        .clone()
        .try_call(Request::from_parts(parts, body))
        .await
    {
        Ok(response) => Ok(response.map(Body::new)),
        Err(e) => {
            tracing::warn!("Failed to serve {}: {}", file.display(), e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// True when `relative` only names entries below its directory.
fn is_contained(relative: &str) -> bool {
    Path::new(relative)
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
}

/// `a b/c.png` -> `/a%20b/c.png`
fn encode_path(relative: &str) -> String {
    let segments: Vec<_> = relative
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| urlencoding::encode(s).into_owned())
        .collect();

    format!("/{}", segments.join("/"))
}

/// Strip the configured base path from a request path.
fn strip_base<'a>(path: &'a str, base: &str) -> &'a str {
    let base = base.trim_end_matches('/');
    match path.strip_prefix(base) {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
        _ => path,
    }
}

fn render_generated_index(state: &ServerState) -> Result<String, StatusCode> {
    let config = &state.config;
    let files = discover_files(&config.root, &[config.out_dir.as_path()]);

    collect_posts(&config.root, &files, true)
        .and_then(|posts| render_index_page(&state.templates, config, &posts))
        .map_err(|e| {
            tracing::warn!("{}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })
}

fn render_generated_categories(state: &ServerState) -> Result<String, StatusCode> {
    let config = &state.config;
    let files = discover_files(&config.root, &[config.out_dir.as_path()]);

    collect_posts(&config.root, &files, true)
        .and_then(|posts| render_categories_page(&state.templates, config, &posts))
        .map_err(|e| {
            tracing::warn!("{}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })
}

fn render_post(state: &ServerState, source: &Path) -> Result<String, StatusCode> {
    Post::load(&state.config.root, source)
        .and_then(|post| render_post_page(&state.templates, &state.config, &post))
        .map_err(|e| {
            tracing::warn!("{}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })
}

fn html_response(html: String) -> Response {
    (
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        inject_reload_script(&html),
    )
        .into_response()
}
