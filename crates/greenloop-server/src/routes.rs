//! 路由配置模块
//!
//! 员工端路由挂在 /api 下，管理端路由挂在 /api/admin 下，
//! 前缀由 main.rs 统一挂载。

use axum::{
    Router,
    middleware::from_fn,
    routing::{delete, get, post, put},
};

use crate::{handlers, middleware::require_permission, state::AppState};

// ============================================
// 员工端
// ============================================

/// 员工端认证路由
fn employee_auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(handlers::employee_auth::login))
        .route("/auth/logout", post(handlers::employee_auth::logout))
        .route("/auth/me", get(handlers::employee_auth::get_current_employee))
        .route("/auth/refresh", post(handlers::employee_auth::refresh_token))
}

/// 行动与记录路由
fn action_routes() -> Router<AppState> {
    Router::new()
        .route("/actions", get(handlers::action::list_active_actions))
        .route("/action-logs", post(handlers::action_log::create_action_log))
        .route("/action-logs", get(handlers::action_log::list_my_action_logs))
}

/// 个人主页、等级与奖励路由
fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/profile", get(handlers::profile::get_profile))
        .route("/levels", get(handlers::level::list_levels_for_employee))
        .route("/rewards", get(handlers::reward::list_rewards_for_employee))
        .route("/rewards/{id}/claim", post(handlers::reward::claim_reward))
        .route("/badges", get(handlers::badge::list_badges_for_employee))
}

/// 团队与挑战路由
fn team_challenge_routes() -> Router<AppState> {
    Router::new()
        .route("/teams", get(handlers::team::list_teams))
        .route("/teams/{id}", get(handlers::team::get_team))
        .route("/teams/{id}/join", post(handlers::team::join_team))
        .route(
            "/challenges",
            get(handlers::challenge::list_challenges_for_employee),
        )
        .route(
            "/challenges/{id}/join",
            post(handlers::challenge::join_challenge),
        )
}

/// 内容路由
fn content_routes() -> Router<AppState> {
    Router::new().route("/content", get(handlers::content::list_published_content))
}

/// 员工端完整路由（不含前缀）
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(employee_auth_routes())
        .merge(action_routes())
        .merge(profile_routes())
        .merge(team_challenge_routes())
        .merge(content_routes())
}

// ============================================
// 管理端
// ============================================

/// 管理端认证路由
fn admin_auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/logout", post(handlers::auth::logout))
        .route("/auth/me", get(handlers::auth::get_current_user))
        .route("/auth/refresh", post(handlers::auth::refresh_token))
}

/// 行动目录管理路由
///
/// 读写分组后各自套权限层再合并，route_layer 只作用于之前加入的路由
fn admin_action_routes() -> Router<AppState> {
    let read = Router::new()
        .route("/actions", get(handlers::action::list_actions))
        .route("/actions/{id}", get(handlers::action::get_action))
        .route_layer(from_fn(require_permission("content:action:read")));

    let write = Router::new()
        .route("/actions", post(handlers::action::create_action))
        .route("/actions/{id}", put(handlers::action::update_action))
        .route("/actions/{id}/publish", post(handlers::action::publish_action))
        .route("/actions/{id}/retire", post(handlers::action::retire_action))
        .route_layer(from_fn(require_permission("content:action:write")));

    read.merge(write)
}

/// 审核管理路由
fn admin_approval_routes() -> Router<AppState> {
    let list = Router::new()
        .route("/approvals", get(handlers::approval::list_pending))
        .route_layer(from_fn(require_permission("approval:log:read")));

    let approve = Router::new()
        .route("/approvals/{id}/approve", post(handlers::approval::approve))
        .route_layer(from_fn(require_permission("approval:log:approve")));

    let reject = Router::new()
        .route("/approvals/{id}/reject", post(handlers::approval::reject))
        .route_layer(from_fn(require_permission("approval:log:reject")));

    list.merge(approve).merge(reject)
}

/// 挑战管理路由
fn admin_challenge_routes() -> Router<AppState> {
    let read = Router::new()
        .route("/challenges", get(handlers::challenge::list_challenges))
        .route("/challenges/{id}", get(handlers::challenge::get_challenge))
        .route_layer(from_fn(require_permission("content:challenge:read")));

    let write = Router::new()
        .route("/challenges", post(handlers::challenge::create_challenge))
        .route("/challenges/{id}", put(handlers::challenge::update_challenge))
        .route(
            "/challenges/{id}/publish",
            post(handlers::challenge::publish_challenge),
        )
        .route(
            "/challenges/{id}/archive",
            post(handlers::challenge::archive_challenge),
        )
        .route_layer(from_fn(require_permission("content:challenge:write")));

    read.merge(write)
}

/// 徽章管理路由
fn admin_badge_routes() -> Router<AppState> {
    let read = Router::new()
        .route("/badges", get(handlers::badge::list_badges))
        .route("/badges/{id}", get(handlers::badge::get_badge))
        .route_layer(from_fn(require_permission("content:badge:read")));

    let write = Router::new()
        .route("/badges", post(handlers::badge::create_badge))
        .route("/badges/{id}", put(handlers::badge::update_badge))
        .route("/badges/{id}/publish", post(handlers::badge::publish_badge))
        .route("/badges/{id}/retire", post(handlers::badge::retire_badge))
        .route_layer(from_fn(require_permission("content:badge:write")));

    read.merge(write)
}

/// 等级与奖励管理路由
fn admin_level_reward_routes() -> Router<AppState> {
    let level_read = Router::new()
        .route("/levels", get(handlers::level::list_levels))
        .route_layer(from_fn(require_permission("content:level:read")));

    let level_write = Router::new()
        .route("/levels", put(handlers::level::upsert_level))
        .route("/levels/{level}", delete(handlers::level::delete_level))
        .route_layer(from_fn(require_permission("content:level:write")));

    let reward_read = Router::new()
        .route("/rewards", get(handlers::reward::list_rewards))
        .route_layer(from_fn(require_permission("content:reward:read")));

    let reward_write = Router::new()
        .route("/rewards", post(handlers::reward::create_reward))
        .route("/rewards/{id}", put(handlers::reward::update_reward))
        .route("/rewards/{id}", delete(handlers::reward::delete_reward))
        .route_layer(from_fn(require_permission("content:reward:write")));

    level_read
        .merge(level_write)
        .merge(reward_read)
        .merge(reward_write)
}

/// 内容管理路由
fn admin_content_routes() -> Router<AppState> {
    let read = Router::new()
        .route("/content", get(handlers::content::list_content))
        .route("/content/{id}", get(handlers::content::get_content))
        .route_layer(from_fn(require_permission("content:item:read")));

    let write = Router::new()
        .route("/content", post(handlers::content::create_content))
        .route("/content/{id}", put(handlers::content::update_content))
        .route(
            "/content/{id}/publish",
            post(handlers::content::publish_content),
        )
        .route(
            "/content/{id}/archive",
            post(handlers::content::archive_content),
        )
        .route_layer(from_fn(require_permission("content:item:write")));

    read.merge(write)
}

/// 团队管理路由
fn admin_team_routes() -> Router<AppState> {
    Router::new()
        .route("/teams", post(handlers::team::create_team))
        .route("/teams/{id}", put(handlers::team::update_team))
        .route("/teams/{id}", delete(handlers::team::delete_team))
        .route_layer(from_fn(require_permission("employee:team:write")))
}

/// 员工管理路由
fn admin_employee_routes() -> Router<AppState> {
    let read = Router::new()
        .route("/employees", get(handlers::employee_admin::list_employees))
        .route("/employees/{id}", get(handlers::employee_admin::get_employee))
        .route_layer(from_fn(require_permission("employee:account:read")));

    let write = Router::new()
        .route(
            "/employees/{id}/enable",
            post(handlers::employee_admin::enable_employee),
        )
        .route(
            "/employees/{id}/disable",
            post(handlers::employee_admin::disable_employee),
        )
        .route_layer(from_fn(require_permission("employee:account:write")));

    read.merge(write)
}

/// 系统用户与角色管理路由
fn admin_system_routes() -> Router<AppState> {
    let user_read = Router::new()
        .route("/users", get(handlers::system_user::list_users))
        .route("/users/{id}", get(handlers::system_user::get_user))
        .route_layer(from_fn(require_permission("system:user:read")));

    let user_write = Router::new()
        .route("/users", post(handlers::system_user::create_user))
        .route("/users/{id}", put(handlers::system_user::update_user))
        .route("/users/{id}", delete(handlers::system_user::delete_user))
        .route(
            "/users/{id}/reset-password",
            post(handlers::system_user::reset_password),
        )
        .route_layer(from_fn(require_permission("system:user:write")));

    // 权限目录是只读的，跟角色读权限一起走
    let role_read = Router::new()
        .route("/roles", get(handlers::system_role::list_roles))
        .route("/roles/{id}", get(handlers::system_role::get_role))
        .route("/permissions", get(handlers::system_role::list_permissions))
        .route_layer(from_fn(require_permission("system:role:read")));

    let role_write = Router::new()
        .route("/roles", post(handlers::system_role::create_role))
        .route("/roles/{id}", put(handlers::system_role::update_role))
        .route("/roles/{id}", delete(handlers::system_role::delete_role))
        .route_layer(from_fn(require_permission("system:role:write")));

    user_read
        .merge(user_write)
        .merge(role_read)
        .merge(role_write)
}

/// 统计报表路由
fn admin_analytics_routes() -> Router<AppState> {
    Router::new()
        .route("/analytics/overview", get(handlers::analytics::get_overview))
        .route("/analytics/trends", get(handlers::analytics::get_monthly_trends))
        .route(
            "/analytics/categories",
            get(handlers::analytics::get_category_distribution),
        )
        .route(
            "/analytics/leaderboard/employees",
            get(handlers::analytics::get_employee_leaderboard),
        )
        .route(
            "/analytics/leaderboard/teams",
            get(handlers::analytics::get_team_leaderboard),
        )
        .route_layer(from_fn(require_permission("analytics:report:read")))
}

/// 操作日志路由
fn admin_log_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/operation-logs",
            get(handlers::operation_log::list_operation_logs),
        )
        .route_layer(from_fn(require_permission("system:log:read")))
}

/// 管理端完整路由（不含前缀）
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .merge(admin_auth_routes())
        .merge(admin_action_routes())
        .merge(admin_approval_routes())
        .merge(admin_challenge_routes())
        .merge(admin_badge_routes())
        .merge(admin_level_reward_routes())
        .merge(admin_content_routes())
        .merge(admin_team_routes())
        .merge(admin_employee_routes())
        .merge(admin_system_routes())
        .merge(admin_analytics_routes())
        .merge(admin_log_routes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routes_construction() {
        let _employee_auth = employee_auth_routes();
        let _action = action_routes();
        let _profile = profile_routes();
        let _team_challenge = team_challenge_routes();
        let _content = content_routes();
        let _api = api_routes();

        let _admin_auth = admin_auth_routes();
        let _admin_action = admin_action_routes();
        let _admin_approval = admin_approval_routes();
        let _admin_challenge = admin_challenge_routes();
        let _admin_badge = admin_badge_routes();
        let _admin_level_reward = admin_level_reward_routes();
        let _admin_content = admin_content_routes();
        let _admin_team = admin_team_routes();
        let _admin_employee = admin_employee_routes();
        let _admin_system = admin_system_routes();
        let _admin_analytics = admin_analytics_routes();
        let _admin_log = admin_log_routes();
        let _admin = admin_routes();
    }
}
