use crate::auth::{self, AdminSession};
use crate::error::{AppError, AppResult};
use crate::layout;
use crate::models::{Direction, LoginForm, Post, Resource, ResourceForm, DEFAULT_BRANCH};
use crate::posts::{self, PostDraft};
use crate::resources;
use crate::security;
use crate::state::AppState;
use crate::uploads::{self, Upload};
use axum::extract::{Multipart, Path, State};
use axum::http::{header, HeaderMap, HeaderName};
use axum::response::{AppendHeaders, Html, IntoResponse, Redirect, Response};
use axum::Form;
use serde::Serialize;
use tracing::{info, warn};

const DASHBOARD: &str = "/admin";

#[derive(Serialize)]
struct Page<T: Serialize> {
    #[serde(flatten)]
    body: T,
    flash: Option<String>,
    is_admin: bool,
}

/// Renders `name` with the common page fields filled in. A flash cookie is
/// shown once and then cleared.
fn render<T: Serialize>(
    state: &AppState,
    headers: &HeaderMap,
    name: &str,
    body: T,
    message: Option<String>,
) -> AppResult<Response> {
    let stored = auth::read_flash(headers);
    let mut cookies: Vec<(HeaderName, String)> = Vec::new();
    if stored.is_some() {
        cookies.push((header::SET_COOKIE, auth::clear_cookie(auth::FLASH_COOKIE)));
    }

    let now = chrono::Utc::now().timestamp();
    let html = state.views.render(
        name,
        Page {
            body,
            flash: message.or(stored),
            is_admin: auth::authenticate(headers, &state.config, now).is_some(),
        },
    )?;
    Ok((AppendHeaders(cookies), Html(html)).into_response())
}

/// Ids arrive as raw path segments so that a non-numeric id is an unknown
/// record rather than a malformed request.
fn record_id(raw: &str) -> AppResult<i64> {
    raw.parse().map_err(|_| AppError::NotFound)
}

#[derive(Serialize)]
struct PostsBody {
    posts: Vec<Post>,
}

#[derive(Serialize)]
struct PostBody {
    post: Post,
}

#[derive(Serialize)]
struct DashboardBody {
    posts: Vec<Post>,
    resources: Vec<Resource>,
    edit_post: Option<Post>,
    accept: String,
}

#[derive(Serialize)]
struct EmptyBody {}

pub async fn index(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Response> {
    let conn = state.db.connect()?;
    let posts = posts::list(&conn)?;
    render(&state, &headers, "index.html", PostsBody { posts }, None)
}

pub async fn blog_detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let id = record_id(&id)?;
    let conn = state.db.connect()?;
    let post = posts::get(&conn, id)?.ok_or(AppError::NotFound)?;
    render(&state, &headers, "blog.html", PostBody { post }, None)
}

pub async fn about(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Response> {
    render(&state, &headers, "about.html", EmptyBody {}, None)
}

pub async fn resources_page(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Response> {
    let conn = state.db.connect()?;
    let items = resources::roadmap(&conn)?;
    let roadmap = layout::build(DEFAULT_BRANCH, &items);
    render(&state, &headers, "resources.html", roadmap, None)
}

pub async fn login_page(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Response> {
    render(&state, &headers, "admin_login.html", EmptyBody {}, None)
}

pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> AppResult<Response> {
    let config = state.config.clone();
    let (username, password) = (form.username.clone(), form.password);
    let valid = tokio::task::spawn_blocking(move || {
        auth::check_credentials(&config, &username, &password)
    })
    .await??;

    if valid {
        let now = chrono::Utc::now().timestamp();
        let token = security::sign_session(&state.config.session_secret, &state.config.admin_username, now)?;
        info!(username = %state.config.admin_username, "admin logged in");
        return Ok((
            AppendHeaders([(
                header::SET_COOKIE,
                auth::session_cookie(&token, state.config.session_max_age),
            )]),
            Redirect::to(DASHBOARD),
        )
            .into_response());
    }

    warn!(username = %form.username.trim(), "admin login failed");
    render(
        &state,
        &headers,
        "admin_login.html",
        EmptyBody {},
        Some("Invalid credentials".to_string()),
    )
}

pub async fn logout() -> Response {
    (
        AppendHeaders([(header::SET_COOKIE, auth::clear_cookie(auth::SESSION_COOKIE))]),
        Redirect::to("/"),
    )
        .into_response()
}

fn dashboard(
    state: &AppState,
    headers: &HeaderMap,
    edit_post: Option<Post>,
) -> AppResult<Response> {
    let conn = state.db.connect()?;
    let body = DashboardBody {
        posts: posts::list(&conn)?,
        resources: resources::list_all(&conn)?,
        edit_post,
        accept: uploads::ALLOWED_EXTENSIONS
            .iter()
            .map(|ext| format!(".{}", ext))
            .collect::<Vec<_>>()
            .join(","),
    };
    render(state, headers, "admin.html", body, None)
}

pub async fn admin_dashboard(
    _admin: AdminSession,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Response> {
    dashboard(&state, &headers, None)
}

pub async fn edit_post_page(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let id = record_id(&id)?;
    let post = posts::get(&state.db.connect()?, id)?.ok_or(AppError::NotFound)?;
    dashboard(&state, &headers, Some(post))
}

/// Text fields and the optional image of the post form.
#[derive(Debug, Default)]
struct PostForm {
    title: String,
    content: String,
    tags: String,
    image: Option<Upload>,
}

async fn read_post_form(mut multipart: Multipart) -> AppResult<PostForm> {
    let mut form = PostForm::default();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "title" => form.title = field.text().await?,
            "content" => form.content = field.text().await?,
            "tags" => form.tags = field.text().await?,
            "image" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                if !file_name.is_empty() {
                    form.image = Some(Upload {
                        file_name,
                        bytes: bytes.to_vec(),
                    });
                }
            }
            _ => {}
        }
    }
    Ok(form)
}

fn store_image(state: &AppState, image: Option<&Upload>) -> AppResult<Option<String>> {
    match image {
        Some(upload) => {
            let now = chrono::Utc::now().timestamp();
            Ok(uploads::store(&state.config.upload_dir, upload, now)?)
        }
        None => Ok(None),
    }
}

pub async fn add_post(
    _admin: AdminSession,
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<Redirect> {
    let form = read_post_form(multipart).await?;
    let draft = PostDraft::new(&form.title, &form.content, &form.tags)
        .map_err(|e| AppError::from_post(e, DASHBOARD))?;

    let image = store_image(&state, form.image.as_ref())?;
    let conn = state.db.connect()?;
    posts::insert(&conn, &draft, &posts::now_date(), image.as_deref())?;
    Ok(Redirect::to(DASHBOARD))
}

pub async fn edit_post(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> AppResult<Redirect> {
    let id = record_id(&id)?;
    let existing = posts::get(&state.db.connect()?, id)?.ok_or(AppError::NotFound)?;

    let form = read_post_form(multipart).await?;
    let draft = PostDraft::edited(&form.title, &form.content, &form.tags)
        .map_err(|e| AppError::from_post(e, &format!("/edit-post/{}", id)))?;

    // a rejected or missing upload keeps the current image
    let image = store_image(&state, form.image.as_ref())?.or(existing.image);
    let conn = state.db.connect()?;
    posts::update(&conn, id, &draft, image.as_deref())?;
    Ok(Redirect::to(DASHBOARD))
}

pub async fn delete_post(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Redirect> {
    let id = record_id(&id)?;
    posts::delete(&state.db.connect()?, id)?;
    Ok(Redirect::to(DASHBOARD))
}

pub async fn add_resource(
    _admin: AdminSession,
    State(state): State<AppState>,
    Form(form): Form<ResourceForm>,
) -> AppResult<Redirect> {
    let mut conn = state.db.connect()?;
    resources::append(&mut conn, &form.res_title, &form.res_url, DEFAULT_BRANCH)?;
    Ok(Redirect::to(DASHBOARD))
}

pub async fn delete_resource(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Redirect> {
    let id = record_id(&id)?;
    let mut conn = state.db.connect()?;
    resources::delete(&mut conn, id)?;
    Ok(Redirect::to(DASHBOARD))
}

pub async fn move_resource(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path((id, direction)): Path<(String, String)>,
) -> AppResult<Redirect> {
    let id = record_id(&id)?;
    let direction: Direction = direction.parse().map_err(AppError::BadRequest)?;
    let mut conn = state.db.connect()?;
    resources::move_resource(&mut conn, id, direction)?;
    Ok(Redirect::to(DASHBOARD))
}
