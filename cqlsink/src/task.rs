use std::collections::HashMap;

use crate::{
    BatchOutput, BatchProcessor, ContactPoint, Error, Result, Session, SinkConfig, SinkRecord,
};

pub const VERSION: &str = "1";

/// The start/put/stop lifecycle driven by the delivery framework.
pub struct SinkTask<S> {
    config: Option<SinkConfig>,
    session: Option<S>,
}

impl<S> Default for SinkTask<S> {
    fn default() -> Self {
        Self { config: None, session: None }
    }
}

impl<S: Session> SinkTask<S> {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn version(&self) -> &'static str {
        VERSION
    }

    /// Parses the connector properties and opens a session through `connect`.
    pub fn start(
        &mut self,
        properties: &HashMap<String, String>,
        connect: impl FnOnce(&[ContactPoint]) -> anyhow::Result<S>,
    ) -> Result<()> {
        let config = SinkConfig::from_properties(properties)?;
        tracing::info!(
            keyspace = config.keyspace(),
            table = config.table(),
            port = config.port(),
            "starting sink task"
        );

        let session = connect(config.contact_points())?;
        tracing::info!(cluster = session.cluster_name(), "connected to cluster");

        // restarting replaces the previous session
        if let Err(err) = self.stop() {
            tracing::warn!(%err, "failed to close the previous session");
        }
        self.config = Some(config);
        self.session = Some(session);
        Ok(())
    }

    /// Writes a batch of records to the target table.
    ///
    /// Every statement the batch produced is executed in record order. Rejected records are
    /// reported in the returned output and are not written.
    pub fn put(&mut self, records: Vec<SinkRecord>) -> Result<BatchOutput> {
        let (Some(config), Some(session)) = (&self.config, &self.session) else {
            return Err(Error::NotStarted);
        };

        if records.is_empty() {
            return Ok(BatchOutput::default());
        }

        let processor = BatchProcessor::new(session, config.keyspace(), config.table());
        let output = processor.process(records)?;
        if output.statements.is_empty() {
            tracing::info!("no valid statements");
            return Ok(output);
        }

        for stmt in &output.statements {
            tracing::debug!(%stmt, "execute");
            session.execute(stmt)?;
        }
        Ok(output)
    }

    /// Closes the session. Stopping a task that is not running does nothing.
    pub fn stop(&mut self) -> Result<()> {
        if let Some(session) = self.session.take() {
            tracing::info!(cluster = session.cluster_name(), "stopping sink task");
            session.close()?;
        }
        self.config = None;
        Ok(())
    }

    #[inline]
    pub fn session(&self) -> Option<&S> {
        self.session.as_ref()
    }

    #[inline]
    pub fn config(&self) -> Option<&SinkConfig> {
        self.config.as_ref()
    }
}
