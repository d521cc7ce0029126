// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use proctor_node::{
    api::{start_server, AppState},
    config::ServiceConfig,
    pipeline::FrameAnalyzer,
    students::ReferenceDatabase,
    vision::{VisionModelConfig, VisionModelManager},
};
use std::{env, sync::Arc};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    println!("🚀 Starting Proctor Node...\n");
    println!("📦 BUILD VERSION: {}", proctor_node::version::VERSION);
    println!("📅 Build Date: {}", proctor_node::version::BUILD_DATE);
    println!();

    let config = ServiceConfig::from_env();

    // Load every optional vision capability; failures degrade, they don't
    // stop the service
    println!("🧠 Loading vision models...");
    let models = VisionModelManager::new(VisionModelConfig::from_service(&config)).await?;
    let status = models.status();
    println!("✅ Vision models initialized: {:?}", status);
    let models = Arc::new(models);

    // Build the student reference database from the labeled image directory
    println!("🎓 Loading student reference database...");
    let students = Arc::new(ReferenceDatabase::load(&config.student_db_dir, &models));
    println!("✅ {} students registered", students.len());

    let analyzer = Arc::new(FrameAnalyzer::new(models, students));
    let state = AppState::new(analyzer);

    println!("🌐 Starting API server on port {}...", config.api_port);
    start_server(state, config.api_port)
        .await
        .map_err(|e| anyhow::anyhow!("API server failed: {}", e))?;

    Ok(())
}
