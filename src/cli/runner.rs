//! CLI runner - executes commands

use crate::catalog::{load_catalog, EndpointCatalog};
use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::EngineConfig;
use crate::engine::{FetchEngine, RateLimitReport};
use crate::error::Result;
use crate::http::{BackoffSettings, BasicAuth, RateLimiter};
use crate::types::{JsonObject, JsonValue};
use futures::StreamExt;
use serde::Serialize;
use serde_json::json;
use tracing::info;

/// Username for HTTP basic authentication
pub const ENV_USERNAME: &str = "ISE_USERNAME";
/// Password for HTTP basic authentication
pub const ENV_PASSWORD: &str = "ISE_PASSWORD";

/// Options for the `fetch` command
#[derive(Debug, Clone, Default)]
pub struct FetchArgs {
    /// Endpoint path
    pub path: String,
    /// Filter expression
    pub filter: Option<String>,
    /// Extra query parameters
    pub params: Vec<(String, String)>,
    /// Records per page
    pub size: Option<u32>,
    /// Page number
    pub page: Option<u32>,
    /// Fetch one page only
    pub no_paginate: bool,
    /// Skip the cache
    pub no_cache: bool,
    /// Print pages as they arrive
    pub stream: bool,
}

impl FetchArgs {
    /// Build the free-form query the engine's `fetch` expects
    pub fn query(&self) -> JsonObject {
        let mut query: JsonObject = self
            .params
            .iter()
            .map(|(k, v)| (k.clone(), JsonValue::String(v.clone())))
            .collect();
        if let Some(size) = self.size {
            query.insert("size".into(), json!(size));
        }
        if let Some(page) = self.page {
            query.insert("page".into(), json!(page));
        }
        if self.no_paginate {
            query.insert("auto_paginate".into(), json!(false));
        }
        if self.no_cache {
            query.insert("use_cache".into(), json!(false));
        }
        query
    }
}

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Fetch {
                path,
                filter,
                params,
                size,
                page,
                no_paginate,
                no_cache,
                stream,
            } => {
                let args = FetchArgs {
                    path: path.clone(),
                    filter: filter.clone(),
                    params: params.clone(),
                    size: *size,
                    page: *page,
                    no_paginate: *no_paginate,
                    no_cache: *no_cache,
                    stream: *stream,
                };
                self.fetch(&args).await
            }
            Commands::Endpoints => self.endpoints(),
            Commands::Category { path } => self.category(path),
            Commands::Limits => self.limits(),
        }
    }

    /// Load the engine configuration, then apply environment overrides
    fn load_config(&self) -> Result<EngineConfig> {
        let mut config = match &self.cli.config {
            Some(path) => EngineConfig::load(path)?,
            None => EngineConfig::default(),
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load the endpoint catalog, or use the configured patterns alone
    fn load_catalog(&self, config: &EngineConfig) -> Result<EndpointCatalog> {
        match &self.cli.catalog {
            Some(path) => load_catalog(path, config.endpoint_categories.clone()),
            None => EndpointCatalog::new(config.endpoint_categories.clone(), Vec::new()),
        }
    }

    /// Basic credentials from the environment, if both are set
    fn credentials() -> Option<BasicAuth> {
        let username = std::env::var(ENV_USERNAME).ok()?;
        let password = std::env::var(ENV_PASSWORD).ok()?;
        Some(BasicAuth::new(username, password))
    }

    async fn fetch(&self, args: &FetchArgs) -> Result<()> {
        let config = self.load_config()?;
        let catalog = self.load_catalog(&config)?;

        let mut builder = FetchEngine::builder(config).catalog(catalog);
        match Self::credentials() {
            Some(credentials) => builder = builder.credentials(credentials),
            None => info!("{ENV_USERNAME}/{ENV_PASSWORD} not set, sending no credentials"),
        }
        let engine = builder.build()?;

        if !args.stream {
            let document = engine
                .fetch(&args.path, args.filter.as_deref(), Some(args.query()))
                .await?;
            self.output(&document);
            return Ok(());
        }

        let mut pages = std::pin::pin!(engine.fetch_stream(
            &args.path,
            args.filter.as_deref(),
            Some(args.query())
        )?);
        while let Some(page) = pages.next().await {
            self.output(&page?);
        }
        Ok(())
    }

    fn endpoints(&self) -> Result<()> {
        let config = self.load_config()?;
        let catalog = self.load_catalog(&config)?;

        let listing: Vec<JsonValue> = catalog
            .entries()
            .iter()
            .map(|entry| {
                json!({
                    "name": entry.name,
                    "path": entry.url,
                    "category": catalog.category_for(&entry.url),
                    "filterable_fields": entry.filterable_fields,
                })
            })
            .collect();
        self.output(&listing);
        Ok(())
    }

    fn category(&self, path: &str) -> Result<()> {
        let config = self.load_config()?;
        let catalog = self.load_catalog(&config)?;

        self.output(&json!({
            "path": path,
            "category": catalog.category_for(path),
            "supports_filter": catalog.supports_filter(path),
        }));
        Ok(())
    }

    fn limits(&self) -> Result<()> {
        let config = self.load_config()?;
        let limiter_config = config.rate_limiter_config();
        limiter_config.validate()?;

        let report = RateLimitReport {
            limits: RateLimiter::new(&limiter_config).info(),
            backoff_settings: BackoffSettings::from(&config.retry_config()),
        };
        self.output(&report);
        Ok(())
    }

    fn output<T: Serialize>(&self, value: &T) {
        let rendered = match self.cli.format {
            OutputFormat::Json => serde_json::to_string(value),
            OutputFormat::Pretty => serde_json::to_string_pretty(value),
        };
        println!("{}", rendered.unwrap_or_default());
    }
}
