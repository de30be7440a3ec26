use crate::process::ProcessRecord;

const AGENT_STAR: char = '*';

/// Widest value of each aligned column in a snapshot
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ColumnWidths {
    pub pid: usize,
    pub ppid: usize,
    pub exec_name: usize,
    pub build_version: usize,
}

impl ColumnWidths {
    pub fn of(records: &[ProcessRecord]) -> Self {
        records.iter().fold(Self::default(), |widths, p| Self {
            pid: widths.pid.max(p.pid.to_string().len()),
            ppid: widths.ppid.max(p.ppid.to_string().len()),
            exec_name: widths.exec_name.max(p.exec_name.chars().count()),
            build_version: widths.build_version.max(p.build_version.chars().count()),
        })
    }
}

fn format_row(p: &ProcessRecord, widths: &ColumnWidths) -> String {
    let agent_star = if p.is_agent { AGENT_STAR } else { ' ' };
    format!(
        "{:>pid_w$} {:>ppid_w$} {:>exec_w$} {} {:>version_w$} {}",
        p.pid,
        p.ppid,
        p.exec_name,
        agent_star,
        p.build_version,
        p.path,
        pid_w = widths.pid,
        ppid_w = widths.ppid,
        exec_w = widths.exec_name,
        version_w = widths.build_version,
    )
}

/// One right-aligned row per process, in snapshot order
pub fn render_list(records: &[ProcessRecord]) -> String {
    let widths = ColumnWidths::of(records);
    records
        .iter()
        .map(|p| format_row(p, &widths) + "\n")
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::testing::{agent, record};

    #[test]
    fn test_widths_fit_widest_value() {
        let records = vec![record(7, 1, "dcrd"), record(1234, 1, "dcrwallet")];

        let widths = ColumnWidths::of(&records);
        assert_eq!(
            widths,
            ColumnWidths {
                pid: 4,
                ppid: 1,
                exec_name: 9,
                build_version: 8,
            }
        );
    }

    #[test]
    fn test_empty_snapshot_has_zero_widths() {
        assert_eq!(ColumnWidths::of(&[]), ColumnWidths::default());
        assert_eq!(render_list(&[]), "");
    }

    #[test]
    fn test_rows_are_right_aligned() {
        let mut wallet = agent(1234, 1, "dcrwallet");
        wallet.build_version = "go1.21".to_string();
        let records = vec![record(7, 1, "dcrd"), wallet];

        assert_eq!(
            render_list(&records),
            "   7 1      dcrd   go1.22.1 /usr/local/bin/dcrd\n\
             1234 1 dcrwallet *   go1.21 /usr/local/bin/dcrwallet\n"
        );
    }

    #[test]
    fn test_no_value_is_truncated() {
        let records = vec![
            record(1, 100000, "dcrd"),
            record(4194304, 1, "dcrlnd"),
            record(42, 1, "dcrctl"),
        ];

        let rendered = render_list(&records);
        for (line, p) in rendered.lines().zip(&records) {
            assert!(line.contains(&p.pid.to_string()));
            assert!(line.contains(&p.ppid.to_string()));
            assert!(line.contains(&p.exec_name));
        }
        let line_lengths: Vec<usize> = rendered
            .lines()
            .zip(&records)
            .map(|(line, p)| line.len() - p.path.len())
            .collect();
        assert!(line_lengths.windows(2).all(|w| w[0] == w[1]));
    }
}
