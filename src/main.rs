use std::net::{IpAddr, SocketAddr};

use axum::{
    Router,
    routing::{delete, get, patch, post},
};
use sqlx::Executor;
use sqlx::postgres::PgPoolOptions;
use survey_backend::{
    AppState,
    ai::AiClient,
    config::Config,
    middleware::{auth_middleware, log_errors, optional_auth},
    routes,
};
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 加载配置
    let config = Config::from_env().expect("Failed to load configuration");

    #[cfg(debug_assertions)]
    tracing::info!("Running in debug mode with CORS enabled");

    #[cfg(not(debug_assertions))]
    tracing::info!("Running in production mode with CORS disabled");

    // 设置数据库连接池
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                conn.execute("SET application_name = 'survey_backend';")
                    .await?;
                Ok(())
            })
        })
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to Postgres");

    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    // 设置应用状态
    let state = AppState {
        pool,
        config: config.clone(),
        ai: AiClient::new(&config),
    };

    // 将路由分为公开路由和受保护路由；公开路由也解析可选身份
    let public_routes = Router::new()
        .route("/register", post(routes::user::register))
        .route("/login", post(routes::user::login))
        .route("/surveys/public", get(routes::survey::public_surveys))
        .route(
            "/surveys/answerable",
            get(routes::survey::answerable_surveys),
        )
        .route("/surveys/{id}", get(routes::survey::get_survey))
        .route(
            "/surveys/{id}/responses",
            post(routes::response::submit_response),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            optional_auth,
        ));

    let protected_routes = Router::new()
        // 用户路由
        .route("/user", get(routes::user::current_user))
        .route("/user/stats", get(routes::user::user_stats))
        // 问卷路由
        .route("/surveys", post(routes::survey::create_survey))
        .route("/surveys/my", get(routes::survey::my_surveys))
        .route("/surveys/answered", get(routes::survey::answered_surveys))
        .route("/surveys/inactive", get(routes::survey::inactive_surveys))
        .route("/surveys/{id}/status", patch(routes::survey::update_status))
        .route("/surveys/{id}", delete(routes::survey::delete_survey))
        .route("/surveys/{id}/results", get(routes::survey::get_results))
        .route("/surveys/{id}/analyze", post(routes::survey::analyze_survey))
        .route(
            "/surveys/{id}/analyze/detailed",
            post(routes::survey::analyze_detailed),
        )
        // AI 辅助路由
        .route("/ai/generate-questions", post(routes::ai::generate_questions))
        .route("/ai/predict-survey", post(routes::ai::predict_survey))
        // 应用认证中间件
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // 创建基础路由
    let router = Router::new().nest(
        &config.api_base_uri.clone(),
        Router::new().merge(public_routes).merge(protected_routes),
    );

    // 添加日志中间件
    let router = router.layer(axum::middleware::from_fn(log_errors));

    // 根据编译模式决定是否添加CORS
    #[cfg(debug_assertions)]
    let router = {
        tracing::debug!("Adding CORS layer for development mode");
        // 设置开发环境的CORS，允许所有来源
        let cors = CorsLayer::permissive();
        router.layer(cors)
    };

    // 添加应用状态
    let app = router.with_state(state.clone());

    // 启动服务器
    let addr = SocketAddr::new(
        state.config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        state.config.server_port,
    );
    tracing::info!("Server listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Failed to start server");
}
