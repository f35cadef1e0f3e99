//! One-time process-environment bootstrap for distributed drivers.
//!
//! Distributed filesystem drivers typically load their native client from a
//! classpath discovered at runtime. Discovery shells out and is expensive,
//! so the facade runs it at most once per instance behind a single-flight
//! guard; the implementations here only know how to perform one discovery
//! attempt. A failed attempt is reported as [`GvfsError::Bootstrap`] and is
//! retried on the next use.

use std::path::Path;
use std::process::Command;

use tracing::info;

use crate::error::{GvfsError, Result};

/// One discovery attempt of the backend driver environment.
pub trait Bootstrap: Send + Sync {
    fn run(&self) -> Result<()>;
}

/// Resolves the Hadoop classpath via `$HADOOP_HOME/bin/hadoop classpath
/// --glob` and exports it (together with `$HADOOP_CONF_DIR`) through the
/// `CLASSPATH` environment variable, where native HDFS drivers expect it.
pub struct HadoopEnvBootstrap;

impl Bootstrap for HadoopEnvBootstrap {
    fn run(&self) -> Result<()> {
        let hadoop_home = std::env::var("HADOOP_HOME").map_err(|_| {
            GvfsError::Bootstrap(
                "HADOOP_HOME is not set; cannot discover the backend classpath".to_string(),
            )
        })?;
        let conf_dir = std::env::var("HADOOP_CONF_DIR").map_err(|_| {
            GvfsError::Bootstrap(
                "HADOOP_CONF_DIR is not set; cannot discover the backend classpath".to_string(),
            )
        })?;

        let shell = format!("{hadoop_home}/bin/hadoop");
        if !Path::new(&shell).exists() {
            return Err(GvfsError::Bootstrap(format!(
                "hadoop shell `{shell}` does not exist"
            )));
        }

        let output = Command::new(&shell)
            .args(["classpath", "--glob"])
            .output()
            .map_err(|e| GvfsError::Bootstrap(format!("cannot run `{shell} classpath`: {e}")))?;
        if !output.status.success() {
            return Err(GvfsError::Bootstrap(format!(
                "`{shell} classpath` exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let discovered = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let mut classpath = format!("{conf_dir}:{discovered}");
        if let Ok(existing) = std::env::var("CLASSPATH") {
            if !existing.is_empty() {
                classpath = format!("{existing}:{classpath}");
            }
        }
        // SAFETY: single mutation of the process environment, performed
        // under the facade's single-flight bootstrap guard.
        unsafe {
            std::env::set_var("CLASSPATH", &classpath);
        }
        info!("backend classpath discovered via {shell}");
        Ok(())
    }
}
