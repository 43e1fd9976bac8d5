//! Hand-rolled RFC-4180-ish CSV support for transaction round-tripping.
//!
//! Quote-aware field splitting, doubled-quote escapes, CR/LF handling and
//! BOM stripping on parse; the writer quotes any field containing a
//! separator, quote or newline.

/// One transaction row as it travels through the CSV boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    pub descricao: String,
    pub valor: f64,
    pub tipo: String,
    pub data: String,
    pub categoria: String,
}

pub const HEADER: [&str; 5] = ["descricao", "valor", "tipo", "data", "categoria"];

/// Parse CSV text into rows of fields.
pub fn parse(input: &str) -> Result<Vec<Vec<String>>, String> {
    let input = input.strip_prefix('\u{feff}').unwrap_or(input);

    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut field_started = false;

    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
            continue;
        }

        match c {
            '"' if field.is_empty() && !field_started => {
                in_quotes = true;
                field_started = true;
            }
            '"' => field.push('"'),
            ',' => {
                row.push(std::mem::take(&mut field));
                field_started = false;
            }
            '\r' => {}
            '\n' => {
                row.push(std::mem::take(&mut field));
                field_started = false;
                rows.push(std::mem::take(&mut row));
            }
            _ => {
                field.push(c);
                field_started = true;
            }
        }
    }

    if in_quotes {
        return Err("unterminated quoted field".to_string());
    }

    if field_started || !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }

    // Drop fully empty trailing rows (a final newline is not a record).
    rows.retain(|r| !(r.len() == 1 && r[0].is_empty()));

    Ok(rows)
}

fn write_field(out: &mut String, field: &str) {
    if field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r') {
        out.push('"');
        for c in field.chars() {
            if c == '"' {
                out.push('"');
            }
            out.push(c);
        }
        out.push('"');
    } else {
        out.push_str(field);
    }
}

/// Serialize rows to CSV text with a trailing newline.
pub fn write(rows: &[Vec<String>]) -> String {
    let mut out = String::new();
    for row in rows {
        for (i, field) in row.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            write_field(&mut out, field);
        }
        out.push('\n');
    }
    out
}

/// Serialize transaction records with the export header.
pub fn export_transactions(records: &[TransactionRecord]) -> String {
    let mut rows: Vec<Vec<String>> = Vec::with_capacity(records.len() + 1);
    rows.push(HEADER.iter().map(|s| s.to_string()).collect());
    for r in records {
        rows.push(vec![
            r.descricao.clone(),
            format!("{:.2}", r.valor),
            r.tipo.clone(),
            r.data.clone(),
            r.categoria.clone(),
        ]);
    }
    write(&rows)
}

/// Accept "30.50" and the Brazilian "30,50".
fn parse_valor(raw: &str) -> Option<f64> {
    let normalized = if raw.contains(',') && !raw.contains('.') {
        raw.replace(',', ".")
    } else {
        raw.to_string()
    };
    normalized.trim().parse().ok()
}

fn normalize_tipo(raw: &str) -> Option<&'static str> {
    match raw.trim().to_lowercase().as_str() {
        "entrada" | "income" | "receita" => Some("entrada"),
        "saida" | "saída" | "expense" | "despesa" => Some("saida"),
        _ => None,
    }
}

/// Parse an exported file back into records. Errors name the offending line.
pub fn import_transactions(input: &str) -> Result<Vec<TransactionRecord>, String> {
    let rows = parse(input)?;

    let mut iter = rows.into_iter();
    let header = iter.next().ok_or_else(|| "empty file".to_string())?;
    let header_lower: Vec<String> = header.iter().map(|h| h.trim().to_lowercase()).collect();
    if header_lower != HEADER {
        return Err(format!(
            "unexpected header: {} (expected {})",
            header.join(","),
            HEADER.join(",")
        ));
    }

    let mut records = Vec::new();
    for (idx, row) in iter.enumerate() {
        let line = idx + 2;
        if row.len() != HEADER.len() {
            return Err(format!("linha {line}: expected {} fields, got {}", HEADER.len(), row.len()));
        }
        let valor = parse_valor(&row[1]).ok_or_else(|| format!("linha {line}: invalid valor \"{}\"", row[1]))?;
        let tipo = normalize_tipo(&row[2]).ok_or_else(|| format!("linha {line}: invalid tipo \"{}\"", row[2]))?;
        records.push(TransactionRecord {
            descricao: row[0].clone(),
            valor,
            tipo: tipo.to_string(),
            data: row[3].trim().to_string(),
            categoria: row[4].clone(),
        });
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(descricao: &str, valor: f64, tipo: &str, data: &str, categoria: &str) -> TransactionRecord {
        TransactionRecord {
            descricao: descricao.to_string(),
            valor,
            tipo: tipo.to_string(),
            data: data.to_string(),
            categoria: categoria.to_string(),
        }
    }

    #[test]
    fn test_parse_simple() {
        let rows = parse("a,b,c\nd,e,f\n").unwrap();
        assert_eq!(rows, vec![vec!["a", "b", "c"], vec!["d", "e", "f"]]);
    }

    #[test]
    fn test_parse_quoted_fields() {
        let rows = parse("\"a,b\",\"say \"\"hi\"\"\",\"line\nbreak\"\n").unwrap();
        assert_eq!(rows[0][0], "a,b");
        assert_eq!(rows[0][1], "say \"hi\"");
        assert_eq!(rows[0][2], "line\nbreak");
    }

    #[test]
    fn test_parse_strips_bom_and_crlf() {
        let rows = parse("\u{feff}a,b\r\nc,d\r\n").unwrap();
        assert_eq!(rows, vec![vec!["a", "b"], vec!["c", "d"]]);
    }

    #[test]
    fn test_parse_unterminated_quote() {
        assert!(parse("\"abc").is_err());
    }

    #[test]
    fn test_roundtrip_idempotence() {
        let records = vec![
            record("Almoço", 30.0, "saida", "2026-08-07", "Alimentação"),
            record("Salário, agosto", 3000.5, "entrada", "2026-08-01", "Salário"),
            record("Livro \"Rust\"", 89.9, "saida", "2026-08-03", "Educação"),
        ];
        let exported = export_transactions(&records);
        let imported = import_transactions(&exported).unwrap();
        assert_eq!(imported, records);

        // A second pass through the boundary changes nothing.
        let again = import_transactions(&export_transactions(&imported)).unwrap();
        assert_eq!(again, records);
    }

    #[test]
    fn test_import_accepts_comma_decimal_and_english_tipo() {
        let csv = "descricao,valor,tipo,data,categoria\nAlmoço,\"30,50\",expense,2026-08-07,Alimentação\n";
        let records = import_transactions(csv).unwrap();
        assert_eq!(records[0].valor, 30.5);
        assert_eq!(records[0].tipo, "saida");
    }

    #[test]
    fn test_import_rejects_bad_rows_with_line_numbers() {
        let missing_field = "descricao,valor,tipo,data,categoria\nAlmoço,30.00,saida,2026-08-07\n";
        let err = import_transactions(missing_field).unwrap_err();
        assert!(err.contains("linha 2"), "{err}");

        let bad_valor = "descricao,valor,tipo,data,categoria\nAlmoço,trinta,saida,2026-08-07,Alimentação\n";
        let err = import_transactions(bad_valor).unwrap_err();
        assert!(err.contains("linha 2"), "{err}");

        let bad_header = "nome,preco\nx,1\n";
        assert!(import_transactions(bad_header).is_err());
    }

    #[test]
    fn test_export_formats_two_decimals() {
        let exported = export_transactions(&[record("a", 30.0, "saida", "2026-08-07", "Outros")]);
        assert!(exported.contains("30.00"));
    }
}
