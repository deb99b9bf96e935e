use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone};
use tokio::io::AsyncWriteExt;

use crate::error::Result;
use crate::http::sanitize::sanitize_path_str;
use crate::logpath::{LogContext, render_log_path};

/// Longest rendered log path.
const MAX_PATH: usize = 4096;

/// Appends one line per request to a file named by a path template.
#[derive(Debug, Clone)]
pub struct AccessLog {
    template: String,
}

impl AccessLog {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// File the request described by `ctx` is logged to.
    pub fn path_for<Tz>(&self, ctx: &LogContext<'_>, when: &DateTime<Tz>) -> PathBuf
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        let rendered = render_log_path(&self.template, ctx, when, MAX_PATH);
        PathBuf::from(sanitize_path_str(&rendered))
    }

    pub async fn record<Tz>(
        &self,
        ctx: &LogContext<'_>,
        when: &DateTime<Tz>,
        line: &str,
    ) -> Result<()>
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        let path = self.path_for(ctx, when);
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            if !Path::new(dir).exists() {
                tokio::fs::create_dir_all(dir).await?;
            }
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        tracing::trace!(path = %path.display(), "Access log line written");
        Ok(())
    }
}
