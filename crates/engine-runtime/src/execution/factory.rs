use connectors::api::{
    base::{error::ApiError, source::Extractor},
    crm::source::CrmConnector,
    gateway::source::GatewayConnector,
    workspace::source::WorkspaceConnector,
};
use model::{
    config::table::{Origin, TableConfig},
    sync::window::ExtractionWindow,
};

/// Builds the extractor for one table and one run.
pub trait ExtractorFactory: Send + Sync {
    fn extractor(
        &self,
        table: &TableConfig,
        window: &ExtractionWindow,
    ) -> Result<Box<dyn Extractor>, ApiError>;
}

/// The configured vendor connector of a run.
#[derive(Clone)]
pub enum SourceConnector {
    Workspace(WorkspaceConnector),
    Gateway(GatewayConnector),
    Crm(CrmConnector),
}

impl SourceConnector {
    pub fn origin(&self) -> Origin {
        match self {
            SourceConnector::Workspace(_) => Origin::Workspace,
            SourceConnector::Gateway(_) => Origin::Gateway,
            SourceConnector::Crm(_) => Origin::Crm,
        }
    }
}

impl ExtractorFactory for SourceConnector {
    fn extractor(
        &self,
        table: &TableConfig,
        window: &ExtractionWindow,
    ) -> Result<Box<dyn Extractor>, ApiError> {
        if table.origin != self.origin() {
            return Err(ApiError::UnsupportedStrategy {
                origin: table.origin.to_string(),
                strategy: format!("{} via {} connector", table.extraction_strategy, self.origin()),
            });
        }

        match self {
            SourceConnector::Workspace(connector) => connector.extractor(table, window),
            SourceConnector::Gateway(connector) => connector.extractor(table, window),
            SourceConnector::Crm(connector) => connector.extractor(table, window),
        }
    }
}
