use crate::models::SplitSummary;
use csv::Writer;

fn amount(value: f64) -> String {
    format!("{:.2}", value)
}

/// 导出分摊结果为 CSV: 每人的明细行, 以及小计/小费/合计行
pub fn export_summary_csv(
    summary: &SplitSummary,
    currency: &str,
) -> Result<Vec<u8>, Box<dyn std::error::Error + Send + Sync>> {
    let mut writer = Writer::from_writer(Vec::new());
    writer.write_record(["person", "line", "quantity", "amount", "currency"])?;

    for person_summary in &summary.person_summaries {
        let name = person_summary.person.name.as_str();
        for line in &person_summary.items {
            let quantity = line.quantity.to_string();
            let price = amount(line.price);
            writer.write_record([
                name,
                line.description.as_str(),
                quantity.as_str(),
                price.as_str(),
                currency,
            ])?;
        }
        let tip_label = format!("Tip ({}%)", summary.tip_percentage);
        for (label, value) in [
            ("Subtotal", person_summary.subtotal),
            (tip_label.as_str(), person_summary.tip),
            ("Total", person_summary.total),
        ] {
            let value = amount(value);
            writer.write_record([name, label, "", value.as_str(), currency])?;
        }
    }

    let outstanding = amount(summary.outstanding);
    writer.write_record(["", "Outstanding", "", outstanding.as_str(), currency])?;
    writer.flush()?;
    Ok(writer.into_inner().map_err(|e| e.to_string())?)
}
