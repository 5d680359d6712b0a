use super::{DocumentError, DocumentRenderer, ReportContext};

/// Machine-readable report: the context itself as pretty-printed JSON, with
/// absent plots as `{"state": "absent"}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonReportRenderer;

impl DocumentRenderer for JsonReportRenderer {
    fn extension(&self) -> &'static str {
        "json"
    }

    fn render(&self, ctx: &ReportContext) -> Result<Vec<u8>, DocumentError> {
        let mut bytes =
            serde_json::to_vec_pretty(ctx).map_err(|e| DocumentError(e.to_string()))?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Evidence;
    use crate::render::PlotKind;
    use std::collections::BTreeMap;

    #[test]
    fn plots_are_tagged() {
        let mut fields = BTreeMap::new();
        fields.insert("source_id", "A".to_string());
        let mut plots = BTreeMap::new();
        plots.insert(PlotKind::LightCurve, Evidence::Absent);
        plots.insert(PlotKind::Sed, Evidence::Present("plots/A_sed.png".to_string()));
        let ctx = ReportContext { fields, plots };

        let value: serde_json::Value =
            serde_json::from_slice(&JsonReportRenderer.render(&ctx).unwrap()).unwrap();
        assert_eq!(value["fields"]["source_id"], "A");
        assert_eq!(value["plots"]["light_curve"]["state"], "absent");
        assert_eq!(value["plots"]["sed"]["state"], "present");
        assert_eq!(value["plots"]["sed"]["value"], "plots/A_sed.png");
    }
}
