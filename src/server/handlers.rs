//! Route handlers. Each one moves its inputs into a storage closure run by
//! [`with_storage`], or by [`with_actor`] when the route needs a session and
//! the session's user is the actor.

use super::auth::{CurrentUser, SESSION_COOKIE};
use super::extract::{ApiJson, ApiPath, ApiQuery};
use super::{ApiError, AppState, with_actor, with_storage};
use crate::config::DEFAULT_PAGE_SIZE;
use crate::format::{IssueHistory, MilestoneProgress, StateChangeReport};
use crate::model::{
    Comment, FilterSummary, Issue, IssueDetail, IssuePage, Label, SavedFilter, User,
};
use crate::storage::{IssueFilter, LabelDraft, MilestoneDraft, MilestoneState, NewIssue, Page};
use axum::Json;
use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::StatusCode;
use axum::response::{AppendHeaders, IntoResponse};
use serde::{Deserialize, Serialize};

type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

// === Users and sessions ===

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub user_id: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: String,
    pub token: String,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

pub async fn register(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<Credentials>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let user = with_storage(&state, move |s| s.register_user(&body.user_id, &body.password)).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn list_users(State(state): State<AppState>) -> ApiResult<Json<Vec<String>>> {
    Ok(Json(with_storage(&state, |s| s.list_user_ids()).await?))
}

pub async fn user_exists(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let exists = with_storage(&state, move |s| s.user_exists(&user_id)).await?;
    Ok(Json(serde_json::json!({ "exists": exists })))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<Credentials>,
) -> ApiResult<impl IntoResponse> {
    let ttl = state.session_ttl;
    let session = with_storage(&state, move |s| {
        let user = s.authenticate(&body.user_id, &body.password)?;
        s.create_session(&user.user_id, ttl)
    })
    .await?;

    tracing::info!(user_id = %session.user_id, "Session started");
    let cookie = format!(
        "{SESSION_COOKIE}={}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
        session.token,
        ttl.num_seconds()
    );
    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(LoginResponse {
            user_id: session.user_id,
            token: session.token,
            expires_at: session.expires_at,
        }),
    ))
}

pub async fn logout(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<impl IntoResponse> {
    let ended = with_storage(&state, move |s| s.delete_session(&user.token)).await?;
    let cookie = format!("{SESSION_COOKIE}=; HttpOnly; Path=/; SameSite=Lax; Max-Age=0");
    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(serde_json::json!({ "logged_out": ended })),
    ))
}

// === Labels ===

pub async fn list_labels(State(state): State<AppState>) -> ApiResult<Json<Vec<Label>>> {
    Ok(Json(with_storage(&state, |s| s.list_labels()).await?))
}

pub async fn get_label(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<Label>> {
    Ok(Json(with_storage(&state, move |s| s.get_label(id)).await?))
}

pub async fn create_label(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(draft): ApiJson<LabelDraft>,
) -> ApiResult<(StatusCode, Json<Label>)> {
    let label = with_actor(&state, user, move |s, actor| s.create_label(&draft, actor)).await?;
    Ok((StatusCode::CREATED, Json(label)))
}

pub async fn update_label(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(draft): ApiJson<LabelDraft>,
) -> ApiResult<Json<Label>> {
    Ok(Json(
        with_actor(&state, user, move |s, actor| s.update_label(id, &draft, actor)).await?,
    ))
}

pub async fn delete_label(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<StatusCode> {
    with_actor(&state, user, move |s, actor| s.delete_label(id, actor)).await?;
    Ok(StatusCode::NO_CONTENT)
}

// === Milestones ===

#[derive(Debug, Default, Deserialize)]
pub struct MilestoneQuery {
    #[serde(default)]
    pub state: MilestoneState,
}

pub async fn list_milestones(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<MilestoneQuery>,
) -> ApiResult<Json<Vec<MilestoneProgress>>> {
    let milestones = with_storage(&state, move |s| s.list_milestones(query.state)).await?;
    Ok(Json(
        milestones.into_iter().map(MilestoneProgress::from).collect(),
    ))
}

pub async fn get_milestone(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<MilestoneProgress>> {
    let milestone = with_storage(&state, move |s| s.get_milestone(id)).await?;
    Ok(Json(milestone.into()))
}

pub async fn create_milestone(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(draft): ApiJson<MilestoneDraft>,
) -> ApiResult<(StatusCode, Json<MilestoneProgress>)> {
    let milestone = with_actor(&state, user, move |s, actor| {
        s.create_milestone(&draft, actor)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(milestone.into())))
}

pub async fn update_milestone(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(draft): ApiJson<MilestoneDraft>,
) -> ApiResult<Json<MilestoneProgress>> {
    let milestone = with_actor(&state, user, move |s, actor| {
        s.update_milestone(id, &draft, actor)
    })
    .await?;
    Ok(Json(milestone.into()))
}

pub async fn delete_milestone(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<StatusCode> {
    with_actor(&state, user, move |s, actor| s.delete_milestone(id, actor)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn close_milestone(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<MilestoneProgress>> {
    let milestone = with_actor(&state, user, move |s, actor| s.close_milestone(id, actor)).await?;
    Ok(Json(milestone.into()))
}

pub async fn reopen_milestone(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<MilestoneProgress>> {
    let milestone = with_actor(&state, user, move |s, actor| s.reopen_milestone(id, actor)).await?;
    Ok(Json(milestone.into()))
}

// === Issues ===

/// Query string of `GET /issues`. `labels` is comma separated.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterParams {
    pub is_closed: Option<bool>,
    pub assignee: Option<String>,
    pub labels: Option<String>,
    pub milestone: Option<String>,
    pub author: Option<String>,
}

impl From<FilterParams> for IssueFilter {
    fn from(params: FilterParams) -> Self {
        let non_blank = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
        Self {
            is_closed: params.is_closed,
            assignee: non_blank(params.assignee),
            labels: params
                .labels
                .map(|labels| {
                    labels
                        .split(',')
                        .map(str::trim)
                        .filter(|label| !label.is_empty())
                        .map(ToString::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            milestone: non_blank(params.milestone),
            author: non_blank(params.author),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageParams {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl PageParams {
    fn to_page(&self) -> crate::error::Result<Page> {
        Page::new(
            self.page.unwrap_or(1),
            self.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        )
    }
}

pub async fn filter_issues(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<FilterParams>,
) -> ApiResult<Json<Vec<Issue>>> {
    let filter = IssueFilter::from(params);
    Ok(Json(
        with_storage(&state, move |s| s.list_filtered(&filter)).await?,
    ))
}

pub async fn list_open(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<PageParams>,
) -> ApiResult<Json<IssuePage>> {
    let page = params.to_page()?;
    Ok(Json(
        with_storage(&state, move |s| s.list_issue_page(false, page)).await?,
    ))
}

pub async fn list_closed(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<PageParams>,
) -> ApiResult<Json<IssuePage>> {
    let page = params.to_page()?;
    Ok(Json(
        with_storage(&state, move |s| s.list_issue_page(true, page)).await?,
    ))
}

pub async fn create_issue(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(new_issue): ApiJson<NewIssue>,
) -> ApiResult<(StatusCode, Json<IssueDetail>)> {
    let detail = with_actor(&state, user, move |s, author| {
        let id = s.create_issue(&new_issue, author)?;
        s.get_issue_detail(id)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

pub async fn get_issue(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<IssueDetail>> {
    Ok(Json(
        with_storage(&state, move |s| s.get_issue_detail(id)).await?,
    ))
}

#[derive(Debug, Deserialize)]
pub struct TitleBody {
    pub title: String,
}

pub async fn update_title(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<TitleBody>,
) -> ApiResult<Json<IssueDetail>> {
    let detail = with_actor(&state, user, move |s, actor| {
        s.update_title(id, &body.title, actor)?;
        s.get_issue_detail(id)
    })
    .await?;
    Ok(Json(detail))
}

#[derive(Debug, Deserialize)]
pub struct LabelsBody {
    pub label_ids: Vec<i64>,
}

pub async fn set_labels(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<LabelsBody>,
) -> ApiResult<Json<IssueDetail>> {
    let detail = with_actor(&state, user, move |s, actor| {
        s.set_labels(id, &body.label_ids, actor)?;
        s.get_issue_detail(id)
    })
    .await?;
    Ok(Json(detail))
}

#[derive(Debug, Serialize)]
pub struct ChangedResponse {
    pub changed: bool,
}

pub async fn add_label(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath((id, label_id)): ApiPath<(i64, i64)>,
) -> ApiResult<Json<ChangedResponse>> {
    let changed = with_actor(&state, user, move |s, actor| {
        s.add_label_to_issue(id, label_id, actor)
    })
    .await?;
    Ok(Json(ChangedResponse { changed }))
}

pub async fn remove_label(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath((id, label_id)): ApiPath<(i64, i64)>,
) -> ApiResult<Json<ChangedResponse>> {
    let changed = with_actor(&state, user, move |s, actor| {
        s.remove_label_from_issue(id, label_id, actor)
    })
    .await?;
    Ok(Json(ChangedResponse { changed }))
}

#[derive(Debug, Deserialize)]
pub struct AssigneesBody {
    pub assignees: Vec<String>,
}

pub async fn set_assignees(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<AssigneesBody>,
) -> ApiResult<Json<IssueDetail>> {
    let detail = with_actor(&state, user, move |s, actor| {
        s.set_assignees(id, &body.assignees, actor)?;
        s.get_issue_detail(id)
    })
    .await?;
    Ok(Json(detail))
}

/// `{"milestone_id": null}` detaches the issue.
#[derive(Debug, Deserialize)]
pub struct MilestoneBody {
    pub milestone_id: Option<i64>,
}

pub async fn reassign_milestone(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<MilestoneBody>,
) -> ApiResult<Json<ChangedResponse>> {
    let changed = with_actor(&state, user, move |s, actor| {
        s.reassign_milestone(id, body.milestone_id, actor)
    })
    .await?;
    Ok(Json(ChangedResponse { changed }))
}

pub async fn close_issue(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<ChangedResponse>> {
    let changed = with_actor(&state, user, move |s, actor| s.close_issue(id, actor)).await?;
    Ok(Json(ChangedResponse { changed }))
}

pub async fn open_issue(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<ChangedResponse>> {
    let changed = with_actor(&state, user, move |s, actor| s.open_issue(id, actor)).await?;
    Ok(Json(ChangedResponse { changed }))
}

#[derive(Debug, Deserialize)]
pub struct BulkBody {
    pub ids: Vec<i64>,
}

pub async fn bulk_close(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(body): ApiJson<BulkBody>,
) -> ApiResult<Json<StateChangeReport>> {
    let changes = with_actor(&state, user, move |s, actor| s.close_issues(&body.ids, actor)).await?;
    Ok(Json(changes.into()))
}

pub async fn bulk_open(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(body): ApiJson<BulkBody>,
) -> ApiResult<Json<StateChangeReport>> {
    let changes = with_actor(&state, user, move |s, actor| s.open_issues(&body.ids, actor)).await?;
    Ok(Json(changes.into()))
}

#[derive(Debug, Default, Deserialize)]
pub struct EventsParams {
    #[serde(default)]
    pub limit: usize,
}

pub async fn issue_events(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(params): ApiQuery<EventsParams>,
) -> ApiResult<Json<IssueHistory>> {
    let events = with_storage(&state, move |s| s.get_events_limited(id, params.limit)).await?;
    Ok(Json(IssueHistory {
        issue_id: id,
        events,
    }))
}

// === Comments ===

#[derive(Debug, Deserialize)]
pub struct CommentBody {
    pub content: String,
}

pub async fn list_comments(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<Vec<Comment>>> {
    Ok(Json(with_storage(&state, move |s| s.get_comments(id)).await?))
}

pub async fn add_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<CommentBody>,
) -> ApiResult<(StatusCode, Json<Comment>)> {
    let comment = with_actor(&state, user, move |s, author| {
        s.add_comment(id, author, &body.content)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn edit_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(comment_id): ApiPath<i64>,
    ApiJson(body): ApiJson<CommentBody>,
) -> ApiResult<Json<Comment>> {
    let comment = with_actor(&state, user, move |s, editor| {
        s.edit_comment(comment_id, editor, &body.content)
    })
    .await?;
    Ok(Json(comment))
}

// === Filters ===

pub async fn filter_summary(State(state): State<AppState>) -> ApiResult<Json<FilterSummary>> {
    Ok(Json(with_storage(&state, |s| s.filter_summary()).await?))
}

#[derive(Debug, Deserialize)]
pub struct SaveFilterBody {
    pub name: String,
    #[serde(default)]
    pub filter: IssueFilter,
}

pub async fn list_saved_filters(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Json<Vec<SavedFilter>>> {
    Ok(Json(
        with_actor(&state, user, move |s, owner| s.list_saved_filters(owner)).await?,
    ))
}

pub async fn save_filter(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(body): ApiJson<SaveFilterBody>,
) -> ApiResult<(StatusCode, Json<SavedFilter>)> {
    let saved = with_actor(&state, user, move |s, owner| {
        s.save_filter(owner, &body.name, &body.filter)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(saved)))
}

pub async fn delete_saved_filter(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<StatusCode> {
    with_actor(&state, user, move |s, owner| s.delete_saved_filter(owner, id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn apply_saved_filter(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<Vec<Issue>>> {
    Ok(Json(
        with_actor(&state, user, move |s, owner| s.apply_saved_filter(owner, id)).await?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TrackerError;

    #[test]
    fn filter_params_split_labels() {
        let filter = IssueFilter::from(FilterParams {
            is_closed: Some(true),
            assignee: Some(" ".to_string()),
            labels: Some("bug, ui,,".to_string()),
            milestone: None,
            author: Some("alice".to_string()),
        });
        assert_eq!(filter.is_closed, Some(true));
        assert_eq!(filter.assignee, None);
        assert_eq!(filter.labels, vec!["bug", "ui"]);
        assert_eq!(filter.author.as_deref(), Some("alice"));
    }

    #[test]
    fn page_params_default_and_validate() {
        let page = PageParams::default().to_page().unwrap();
        assert_eq!((page.page, page.page_size), (1, DEFAULT_PAGE_SIZE));
        let bad = PageParams {
            page: Some(0),
            page_size: None,
        };
        assert!(matches!(
            bad.to_page(),
            Err(TrackerError::InvalidPage { page: 0 })
        ));
    }
}
