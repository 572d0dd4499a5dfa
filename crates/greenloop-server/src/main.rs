//! GreenLoop 服务端
//!
//! 员工环保行为激励平台的 REST API，员工端挂 /api，管理端挂 /api/admin。

use axum::{
    Json, Router,
    extract::Request,
    http::HeaderValue,
    middleware,
    middleware::Next,
    response::Response,
    routing::get,
};
use greenloop_server::{
    auth::JwtConfig,
    middleware::{audit_middleware, auth_middleware, require_admin_scope},
    routes,
    state::AppState,
    worker::ChallengeLifecycleWorker,
};
use greenloop_shared::{
    config::AppConfig,
    database::Database,
    observability::{self, ObservabilityConfig, middleware as obs_middleware},
};
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 统一加载配置：从 config/{service_name}.toml 加载，包含可观测性配置
    let config = AppConfig::load("greenloop-server").unwrap_or_default();

    let obs_config = ObservabilityConfig::from_app_config(&config.observability, &config.service_name);
    let _guard = observability::init(&obs_config).await?;

    info!("Starting greenloop-server on {}", config.server_addr());

    // 初始化数据库并应用迁移
    let db = Database::connect(&config.database).await?;
    db.run_migrations().await?;

    // JWT 密钥配置：生产环境必须通过环境变量注入，开发环境使用默认值
    let jwt_secret = std::env::var("GREENLOOP_JWT_SECRET").unwrap_or_else(|_| {
        let default_secret = "greenloop-secret-key-change-in-production".to_string();
        if config.is_production() {
            panic!("GREENLOOP_JWT_SECRET must be set in production environment");
        }
        warn!("Using default JWT secret - set GREENLOOP_JWT_SECRET for production");
        default_secret
    });

    let jwt_expires = std::env::var("GREENLOOP_JWT_EXPIRES_SECS")
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(86400);

    let jwt_config = JwtConfig {
        secret: jwt_secret,
        expires_in_secs: jwt_expires,
        issuer: "greenloop-server".to_string(),
    };

    let state = AppState::new(db.pool().clone(), jwt_config);

    // CORS 配置：通过 GREENLOOP_CORS_ORIGINS 环境变量控制允许的来源
    // 默认允许本地开发地址，生产环境应设置为实际域名
    let allowed_origins = std::env::var("GREENLOOP_CORS_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:3000,http://localhost:5173".to_string());

    let cors = if allowed_origins == "*" {
        // 生产环境使用通配符 CORS 是严重的安全隐患
        if config.is_production() {
            warn!("GREENLOOP_CORS_ORIGINS=\"*\" 在生产环境中不安全，请设置为具体域名");
        }
        info!("CORS allowed_origins: * (all origins)");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        info!("CORS allowed_origins: {}", allowed_origins);
        let origins: Vec<_> = allowed_origins
            .split(',')
            .filter_map(|s| s.trim().parse::<HeaderValue>().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    // 启动挑战生命周期 Worker
    // 在 state 被 move 到 Router 之前克隆连接池
    let worker_pool = db.pool().clone();
    tokio::spawn(async move {
        let worker = ChallengeLifecycleWorker::new(worker_pool);
        worker.run().await;
    });

    let app = Router::new()
        .nest("/api/admin", routes::admin_routes())
        .nest("/api", routes::api_routes())
        .route("/health", get(health_check))
        .route(
            "/ready",
            get({
                let db_for_ready = db;
                move || readiness_check(db_for_ready.clone())
            }),
        )
        // 审计中间件：自动记录管理端写操作到 operation_logs（位于 auth 之后，可访问 Claims）
        .layer(middleware::from_fn_with_state(state.clone(), audit_middleware))
        // HTTP 安全头：纵深防御，即使反向代理未配置也确保基本安全策略生效
        .layer(middleware::from_fn(security_headers))
        .layer(cors)
        // 请求级超时，慢查询不拖垮连接池
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        // 管理端作用域：员工 Token 不能访问 /api/admin
        .layer(middleware::from_fn(require_admin_scope))
        // 认证中间件：验证 JWT Token
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        // 可观测性中间件：请求追踪和指标收集
        .layer(middleware::from_fn(obs_middleware::http_tracing))
        .layer(middleware::from_fn(obs_middleware::request_id))
        .with_state(state);

    let listener = TcpListener::bind(config.server_addr()).await?;
    info!("Listening on {}", config.server_addr());

    // 优雅关闭：收到 SIGTERM（K8s 停止 Pod）或 Ctrl+C 时，
    // 停止接收新连接并等待已有请求处理完毕
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");

    Ok(())
}

/// 为所有响应注入 HTTP 安全头
async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    // 禁止浏览器猜测 Content-Type
    headers.insert("x-content-type-options", "nosniff".parse().unwrap());
    // 禁止页面被嵌入 iframe，防止点击劫持
    headers.insert("x-frame-options", "DENY".parse().unwrap());
    // 强制浏览器后续访问只使用 HTTPS
    headers.insert(
        "strict-transport-security",
        "max-age=31536000; includeSubDomains".parse().unwrap(),
    );
    // 旧的 X-XSS-Protection 可能引入侧信道漏洞，显式禁用，依赖 CSP
    headers.insert("x-xss-protection", "0".parse().unwrap());
    response
}

/// 监听关闭信号
///
/// K8s 通过 SIGTERM 通知 Pod 停止；本地开发通过 Ctrl+C。
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("注册 Ctrl+C 处理器失败");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("注册 SIGTERM 处理器失败")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown..."),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown..."),
    }
}

/// 存活探针：服务进程正常即返回 ok
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "greenloop-server"
    }))
}

/// 就绪探针：检查数据库连接是否可用
///
/// K8s 就绪探针失败时会将 Pod 从 Service 端点移除
async fn readiness_check(db: Database) -> Json<serde_json::Value> {
    let db_ok = db.health_check().await.is_ok();

    Json(serde_json::json!({
        "status": if db_ok { "ok" } else { "degraded" },
        "service": "greenloop-server",
        "checks": {
            "database": if db_ok { "ok" } else { "fail" }
        }
    }))
}
