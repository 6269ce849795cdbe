use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use ibsendtrap_mad::consts::trap_name;
use ibsendtrap_mad::NoticeDetails;
use ibsendtrap_trap::{TrapKind, TrapReport};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

#[derive(Debug, Serialize)]
struct TrapOutput<'a> {
    trap: TrapKind,
    trap_number: u16,
    trap_class: &'static str,
    issuer_lid: u16,
    sm_lid: u16,
    sm_sl: u8,
    transaction_id: u64,
    ca: &'a str,
    port: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_port: Option<u8>,
    notice: String,
}

fn trap_output<'a>(report: &TrapReport, ca: &'a str) -> TrapOutput<'a> {
    let error_port = match report.notice.details {
        NoticeDetails::LinkIntegrity(d) => Some(d.port_num),
        _ => None,
    };
    TrapOutput {
        trap: report.trap,
        trap_number: report.notice.trap_number,
        trap_class: trap_name(report.notice.trap_number),
        issuer_lid: report.issuer.lid(),
        sm_lid: report.destination.lid,
        sm_sl: report.destination.sl,
        transaction_id: report.transaction_id,
        ca,
        port: report.issuer.port_num,
        error_port,
        notice: hex(report.notice.to_bytes().as_ref()),
    }
}

pub fn print_report(report: &TrapReport, ca: &str, format: OutputFormat) {
    let out = trap_output(report, ca);
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["TRAP", "NUMBER", "ISSUER LID", "SM LID", "TID", "CA", "PORT"])
                .add_row(vec![
                    out.trap.to_string(),
                    out.trap_number.to_string(),
                    format!("{:#06x}", out.issuer_lid),
                    format!("{:#06x}", out.sm_lid),
                    format!("{:#010x}", out.transaction_id),
                    out.ca.to_string(),
                    out.port.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "trap={} ({} {}) issuer_lid={:#06x} sm_lid={:#06x} tid={:#010x} ca={} port={}",
                out.trap,
                out.trap_number,
                out.trap_class,
                out.issuer_lid,
                out.sm_lid,
                out.transaction_id,
                out.ca,
                out.port
            );
        }
    }
}

fn hex(data: &[u8]) -> String {
    data.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use ibsendtrap_transport::{PortId, SelfAddress};
    use ibsendtrap_trap::local_link_integrity;

    use super::*;

    #[test]
    fn json_report_fields() {
        let report = TrapReport {
            trap: TrapKind::LocalLinkIntegrity,
            notice: local_link_integrity(7, 4),
            issuer: SelfAddress {
                port_id: PortId::smi(7),
                port_num: 1,
            },
            destination: PortId::smi(1),
            transaction_id: 42,
        };

        let value = serde_json::to_value(trap_output(&report, "mlx5_0")).unwrap();
        assert_eq!(value["trap"], "local_link_integrity");
        assert_eq!(value["trap_number"], 129);
        assert_eq!(value["trap_class"], "LOCAL_LINK_INTEGRITY");
        assert_eq!(value["issuer_lid"], 7);
        assert_eq!(value["error_port"], 4);
        assert_eq!(value["ca"], "mlx5_0");
        assert!(value["notice"]
            .as_str()
            .unwrap()
            .starts_with("84000001008100070000"));
    }
}
