//! Comma-separated text → rows of cells. Handles quoted cells with embedded
//! commas, doubled quotes and CRLF line endings. Blank lines are dropped.

pub fn parse_rows(text: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut cell = String::new();
    let mut quoted = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if quoted => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    cell.push('"');
                } else {
                    quoted = false;
                }
            }
            '"' if cell.is_empty() => quoted = true,
            ',' if !quoted => row.push(std::mem::take(&mut cell)),
            '\r' | '\n' if !quoted => {
                if ch == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                row.push(std::mem::take(&mut cell));
                push_row(&mut rows, std::mem::take(&mut row));
            }
            _ => cell.push(ch),
        }
    }

    if !cell.is_empty() || !row.is_empty() {
        row.push(cell);
        push_row(&mut rows, row);
    }

    rows
}

fn push_row(rows: &mut Vec<Vec<String>>, row: Vec<String>) {
    if row.iter().any(|c| !c.trim().is_empty()) {
        rows.push(row);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_plain_rows() {
        let rows = parse_rows("patch,3.24,3.25\nRain of Chaos,120000,121400\n");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], vec!["Rain of Chaos", "120000", "121400"]);
    }

    #[test]
    fn quoted_cells_keep_commas_and_quotes() {
        let rows = parse_rows("\"The \"\"Wolf\"\", Reborn\",\"1,000\"\r\nx,1");
        assert_eq!(rows[0], vec!["The \"Wolf\", Reborn", "1,000"]);
        assert_eq!(rows[1], vec!["x", "1"]);
    }

    #[test]
    fn blank_lines_are_dropped() {
        let rows = parse_rows("a,b\n\n,\n c , d \n");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], vec![" c ", " d "]);
    }

    #[test]
    fn trailing_empty_cell_is_kept() {
        let rows = parse_rows("Mitts,5279,\n");
        assert_eq!(rows[0], vec!["Mitts", "5279", ""]);
    }
}
