#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::Mutex;

use axum::Json;
use axum::Router;
use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use axum::routing::post;
use axum::routing::put;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use repo_editor::App;
use repo_editor::Config;
use repo_editor::clients::github::GithubClient;
use serde::Deserialize;
use serde_json::Value;
use serde_json::json;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::Layer as _;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

pub const OWNER: &str = "test";
pub const REPO: &str = "repo";
pub const TOKEN: &str = "ghp_test_token";

pub fn setup_logging() -> anyhow::Result<()> {
    let timer = tracing_subscriber::fmt::time::ChronoLocal::new("%H:%M:%S%.3f".into());
    let format = tracing_subscriber::fmt::format().with_timer(timer);
    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env()?;
    let subscriber = tracing_subscriber::fmt::layer()
        .with_test_writer()
        .event_format(format)
        .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
        .with_filter(filter);
    tracing_subscriber::registry().with(subscriber).init();
    Ok(())
}

// -----------------------------------------------------------------------------
// In-memory GitHub

#[derive(Debug, Clone)]
pub struct FakeFile {
    pub content: String,
    pub sha: String,
}

#[derive(Debug, Clone)]
pub struct FakePr {
    pub number: u64,
    pub title: String,
    pub body: String,
    pub head: String,
    pub base: String,
    pub open: bool,
    pub mergeable: bool,
    pub merge_method: Option<String>,
}

#[derive(Default)]
pub struct FakeState {
    /// branch -> path -> file
    pub branches: HashMap<String, HashMap<String, FakeFile>>,
    /// branch -> tip sha
    pub refs: HashMap<String, String>,
    pub prs: Vec<FakePr>,
    /// Every request that reached the fake, as "METHOD path".
    pub requests: Vec<String>,
    pub put_attempts: usize,
    next_sha: u64,
}

impl FakeState {
    fn mint_sha(&mut self) -> String {
        self.next_sha += 1;
        format!("{:040x}", self.next_sha)
    }

    /// Record a commit on `branch` and move its tip.
    fn commit(&mut self, branch: &str) {
        let sha = self.mint_sha();
        self.refs.insert(branch.to_string(), sha);
    }

    pub fn file(&self, branch: &str, path: &str) -> Option<FakeFile> {
        self.branches.get(branch)?.get(path).cloned()
    }
}

#[derive(Clone, Default)]
pub struct FakeGithub {
    pub state: Arc<Mutex<FakeState>>,
}

impl FakeGithub {
    /// A repository whose `main` holds `index.html` and `css/site.css`.
    pub fn seeded() -> Self {
        let fake = Self::default();
        {
            let mut state = fake.state.lock().unwrap();
            state.commit("main");
            let index_sha = state.mint_sha();
            let css_sha = state.mint_sha();
            let files = HashMap::from([
                (
                    "index.html".to_string(),
                    FakeFile {
                        content: "<p>hello</p>\n".to_string(),
                        sha: index_sha,
                    },
                ),
                (
                    "css/site.css".to_string(),
                    FakeFile {
                        content: "body { margin: 0; }\n".to_string(),
                        sha: css_sha,
                    },
                ),
            ]);
            state.branches.insert("main".to_string(), files);
        }
        fake
    }

    pub fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn router(&self) -> Router {
        let repo = format!("/repos/{}/{}", OWNER, REPO);
        Router::new()
            .route("/user", get(fake_user))
            .route(&format!("{repo}/contents"), get(fake_list_root))
            .route(
                &format!("{repo}/contents/{{*path}}"),
                get(fake_get_file).put(fake_put_file),
            )
            .route(&format!("{repo}/git/ref/heads/{{*branch}}"), get(fake_get_ref))
            .route(&format!("{repo}/git/refs"), post(fake_create_ref))
            .route(
                &format!("{repo}/pulls"),
                get(fake_list_prs).post(fake_create_pr),
            )
            .route(&format!("{repo}/pulls/{{number}}/merge"), put(fake_merge_pr))
            .with_state(self.clone())
    }
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

/// Record the request and check the bearer token.
fn admit(fake: &FakeGithub, headers: &HeaderMap, request: String) -> Result<(), Response> {
    fake.lock().requests.push(request);
    let expected = format!("Bearer {}", TOKEN);
    match headers.get("authorization").and_then(|v| v.to_str().ok()) {
        Some(value) if value == expected => Ok(()),
        _ => Err(error(StatusCode::UNAUTHORIZED, "Bad credentials")),
    }
}

/// Base64 wrapped at 60 columns, the way GitHub returns it.
fn wrapped_base64(content: &str) -> String {
    let encoded = STANDARD.encode(content.as_bytes());
    encoded
        .as_bytes()
        .chunks(60)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned() + "\n")
        .collect()
}

fn pr_json(pr: &FakePr) -> Value {
    json!({
        "number": pr.number,
        "html_url": format!("https://github.com/{}/{}/pull/{}", OWNER, REPO, pr.number),
        "title": pr.title,
        "body": pr.body,
        "state": if pr.open { "open" } else { "closed" },
        "head": { "ref": pr.head },
        "base": { "ref": pr.base },
    })
}

async fn fake_user(State(fake): State<FakeGithub>, headers: HeaderMap) -> Response {
    if let Err(response) = admit(&fake, &headers, "GET /user".to_string()) {
        return response;
    }
    Json(json!({ "login": "octocat" })).into_response()
}

async fn fake_list_root(State(fake): State<FakeGithub>, headers: HeaderMap) -> Response {
    if let Err(response) = admit(&fake, &headers, "GET contents".to_string()) {
        return response;
    }
    let state = fake.lock();
    let Some(files) = state.branches.get("main") else {
        return error(StatusCode::NOT_FOUND, "Not Found");
    };

    let mut names: Vec<(String, &str)> = files
        .keys()
        .map(|path| match path.split_once('/') {
            Some((dir, _)) => (dir.to_string(), "dir"),
            None => (path.clone(), "file"),
        })
        .collect();
    names.sort();
    names.dedup();

    let entries: Vec<Value> = names
        .into_iter()
        .map(|(name, kind)| json!({ "name": name, "path": name, "type": kind, "sha": "0" }))
        .collect();
    Json(Value::Array(entries)).into_response()
}

#[derive(Deserialize)]
struct RefQuery {
    #[serde(rename = "ref")]
    ref_name: Option<String>,
}

async fn fake_get_file(
    State(fake): State<FakeGithub>,
    headers: HeaderMap,
    Path(path): Path<String>,
    Query(query): Query<RefQuery>,
) -> Response {
    if let Err(response) = admit(&fake, &headers, format!("GET contents/{}", path)) {
        return response;
    }
    let branch = query.ref_name.unwrap_or_else(|| "main".to_string());
    match fake.lock().file(&branch, &path) {
        Some(file) => Json(json!({
            "type": "file",
            "path": path,
            "sha": file.sha,
            "encoding": "base64",
            "content": wrapped_base64(&file.content),
        }))
        .into_response(),
        None => error(StatusCode::NOT_FOUND, "Not Found"),
    }
}

#[derive(Deserialize)]
struct PutBody {
    message: String,
    content: String,
    sha: Option<String>,
    branch: Option<String>,
}

async fn fake_put_file(
    State(fake): State<FakeGithub>,
    headers: HeaderMap,
    Path(path): Path<String>,
    Json(body): Json<PutBody>,
) -> Response {
    if let Err(response) = admit(&fake, &headers, format!("PUT contents/{}", path)) {
        return response;
    }
    let mut state = fake.lock();
    state.put_attempts += 1;

    let branch = body.branch.unwrap_or_else(|| "main".to_string());
    let Some(current) = state.file(&branch, &path) else {
        return error(StatusCode::NOT_FOUND, "Not Found");
    };
    if body.message.is_empty() {
        return error(StatusCode::UNPROCESSABLE_ENTITY, "message is required");
    }
    if body.sha.as_deref() != Some(current.sha.as_str()) {
        return error(
            StatusCode::CONFLICT,
            &format!("{} does not match {}", path, body.sha.unwrap_or_default()),
        );
    }
    let Ok(bytes) = STANDARD.decode(body.content.as_bytes()) else {
        return error(StatusCode::UNPROCESSABLE_ENTITY, "content is not valid Base64");
    };
    let Ok(content) = String::from_utf8(bytes) else {
        return error(StatusCode::UNPROCESSABLE_ENTITY, "content is not UTF-8");
    };

    let sha = state.mint_sha();
    state.branches.entry(branch.clone()).or_default().insert(
        path.clone(),
        FakeFile {
            content,
            sha: sha.clone(),
        },
    );
    state.commit(&branch);
    let commit_sha = state.refs.get(&branch).cloned().unwrap_or_default();

    Json(json!({
        "content": { "path": path, "sha": sha },
        "commit": { "sha": commit_sha },
    }))
    .into_response()
}

async fn fake_get_ref(
    State(fake): State<FakeGithub>,
    headers: HeaderMap,
    Path(branch): Path<String>,
) -> Response {
    if let Err(response) = admit(&fake, &headers, format!("GET ref {}", branch)) {
        return response;
    }
    match fake.lock().refs.get(&branch) {
        Some(sha) => Json(json!({
            "ref": format!("refs/heads/{}", branch),
            "object": { "sha": sha, "type": "commit" },
        }))
        .into_response(),
        None => error(StatusCode::NOT_FOUND, "Not Found"),
    }
}

#[derive(Deserialize)]
struct CreateRefBody {
    #[serde(rename = "ref")]
    ref_name: String,
    sha: String,
}

async fn fake_create_ref(
    State(fake): State<FakeGithub>,
    headers: HeaderMap,
    Json(body): Json<CreateRefBody>,
) -> Response {
    if let Err(response) = admit(&fake, &headers, format!("POST refs {}", body.ref_name)) {
        return response;
    }
    let Some(branch) = body.ref_name.strip_prefix("refs/heads/") else {
        return error(StatusCode::UNPROCESSABLE_ENTITY, "Reference name is invalid");
    };
    let mut state = fake.lock();
    if state.refs.contains_key(branch) {
        return error(StatusCode::UNPROCESSABLE_ENTITY, "Reference already exists");
    }
    let Some(source) = state
        .refs
        .iter()
        .find(|(_, sha)| **sha == body.sha)
        .map(|(name, _)| name.clone())
    else {
        return error(StatusCode::UNPROCESSABLE_ENTITY, "Object does not exist");
    };

    let files = state.branches.get(&source).cloned().unwrap_or_default();
    state.branches.insert(branch.to_string(), files);
    state.refs.insert(branch.to_string(), body.sha.clone());

    (
        StatusCode::CREATED,
        Json(json!({ "ref": body.ref_name, "object": { "sha": body.sha } })),
    )
        .into_response()
}

#[derive(Deserialize)]
struct CreatePrBody {
    title: String,
    body: String,
    head: String,
    base: String,
}

async fn fake_create_pr(
    State(fake): State<FakeGithub>,
    headers: HeaderMap,
    Json(body): Json<CreatePrBody>,
) -> Response {
    if let Err(response) = admit(&fake, &headers, format!("POST pulls {}", body.head)) {
        return response;
    }
    let mut state = fake.lock();
    if !state.refs.contains_key(&body.head) || !state.refs.contains_key(&body.base) {
        return error(StatusCode::UNPROCESSABLE_ENTITY, "Validation Failed");
    }

    let pr = FakePr {
        number: state.prs.len() as u64 + 1,
        title: body.title,
        body: body.body,
        head: body.head,
        base: body.base,
        open: true,
        mergeable: true,
        merge_method: None,
    };
    let response = pr_json(&pr);
    state.prs.push(pr);
    (StatusCode::CREATED, Json(response)).into_response()
}

async fn fake_list_prs(State(fake): State<FakeGithub>, headers: HeaderMap) -> Response {
    if let Err(response) = admit(&fake, &headers, "GET pulls".to_string()) {
        return response;
    }
    let state = fake.lock();
    let prs: Vec<Value> = state.prs.iter().filter(|pr| pr.open).map(pr_json).collect();
    Json(Value::Array(prs)).into_response()
}

#[derive(Deserialize)]
struct MergeBody {
    commit_title: String,
    merge_method: String,
}

async fn fake_merge_pr(
    State(fake): State<FakeGithub>,
    headers: HeaderMap,
    Path(number): Path<u64>,
    Json(body): Json<MergeBody>,
) -> Response {
    if let Err(response) = admit(&fake, &headers, format!("PUT merge {}", number)) {
        return response;
    }
    let mut state = fake.lock();
    let Some(index) = state.prs.iter().position(|pr| pr.number == number) else {
        return error(StatusCode::NOT_FOUND, "Not Found");
    };
    let pr = state.prs[index].clone();
    if !pr.open || !pr.mergeable {
        return error(StatusCode::METHOD_NOT_ALLOWED, "Pull Request is not mergeable");
    }

    let head_files = state.branches.get(&pr.head).cloned().unwrap_or_default();
    state.branches.entry(pr.base.clone()).or_default().extend(head_files);
    state.commit(&pr.base);
    state.prs[index].open = false;
    state.prs[index].merge_method = Some(body.merge_method);

    Json(json!({
        "merged": true,
        "message": format!("{} merged", body.commit_title),
        "sha": state.refs.get(&pr.base).cloned().unwrap_or_default(),
    }))
    .into_response()
}

// -----------------------------------------------------------------------------
// Harness

async fn spawn(router: Router) -> anyhow::Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    Ok(addr)
}

/// A fake GitHub plus an editor server pointed at it.
pub struct Harness {
    pub fake: FakeGithub,
    pub app: Arc<App>,
    pub base_url: String,
    pub http: reqwest::Client,
}

impl Harness {
    pub async fn start() -> anyhow::Result<Self> {
        let fake = FakeGithub::seeded();
        let github_addr = spawn(fake.router()).await?;

        let config = Config::new(OWNER.to_string(), REPO.to_string())
            .with_api_url(&format!("http://{}", github_addr));
        let gh = GithubClient::new(&config)?;
        let app = Arc::new(App::new(config, Arc::new(gh)));
        let editor_addr = spawn(repo_editor::server::create_router(app.clone())).await?;

        Ok(Self {
            fake,
            app,
            base_url: format!("http://{}", editor_addr),
            http: reqwest::Client::new(),
        })
    }

    pub async fn start_authenticated() -> anyhow::Result<Self> {
        let harness = Self::start().await?;
        let (status, _) = harness.post_json("/auth", json!({ "token": TOKEN })).await?;
        anyhow::ensure!(status == 200, "auth failed with {}", status);
        Ok(harness)
    }

    pub async fn post_json(&self, path: &str, body: Value) -> anyhow::Result<(u16, Value)> {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .json(&body)
            .send()
            .await?;
        let status = response.status().as_u16();
        Ok((status, response.json().await?))
    }

    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> anyhow::Result<(u16, Value)> {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .form(form)
            .send()
            .await?;
        let status = response.status().as_u16();
        Ok((status, response.json().await?))
    }

    pub async fn get_json(&self, path: &str) -> anyhow::Result<(u16, Value)> {
        let response = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await?;
        let status = response.status().as_u16();
        Ok((status, response.json().await?))
    }

    pub async fn get_text(&self, path: &str) -> anyhow::Result<(u16, String)> {
        let response = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await?;
        let status = response.status().as_u16();
        Ok((status, response.text().await?))
    }
}
