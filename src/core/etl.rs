use crate::core::Pipeline;
use crate::domain::model::{Counters, TransformResult};
use crate::utils::error::Result;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    /// Runs extract, transform and load in order.
    ///
    /// Nothing is written unless extract and transform both succeed.
    pub fn run(&self, counters: &Counters) -> Result<TransformResult> {
        tracing::info!("Starting ETL process");

        tracing::debug!("Extracting data");
        let raw_data = self.pipeline.extract()?;
        tracing::info!(
            "Extracted {} rows with {} columns",
            raw_data.rows.len(),
            raw_data.headers.len()
        );

        tracing::debug!("Transforming data");
        let result = self.pipeline.transform(raw_data, counters)?;
        tracing::info!("Transformed into {} rows", result.rows.len());

        tracing::debug!("Loading data");
        self.pipeline.load(&result)?;

        Ok(result)
    }
}
