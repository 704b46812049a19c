//! Integration tests for csv-sleuth

use csv_sleuth::detect::escape::{ESCAPE_CANDIDATES, detect_escape};
use csv_sleuth::detect::qualifier::{QUOTE_CANDIDATES, detect_qualifier};
use csv_sleuth::{
    CancelToken, CharReader, Dialect, Quote, RecordDelimiter, RowRealigner, SampleLimits, Sampler,
    Sniffer, SnifferError, Tokenizer,
};
use std::io::{BufReader, Cursor, Write};
use tempfile::NamedTempFile;

fn tokenize_all(reader: &mut CharReader<'_>, dialect: &Dialect) -> Vec<Vec<String>> {
    Tokenizer::from_start(reader, dialect)
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
}

fn preamble_file() -> String {
    let mut text = String::from(
        "Quarterly sales report\nGenerated on 2024-01-05, by export\nRegion: all\nCurrency, EUR\nConfidential\n",
    );
    text.push_str("id,name,city,zip,amount\n");
    for i in 1..20 {
        text.push_str(&format!("{i},Name{i},Paris,750{:02},{i}.50\n", i % 20));
    }
    text
}

#[test]
fn test_tokenizer_round_trip_through_csv_writer() {
    let fields = ["a", "b,c", "d\"e"];
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(fields).unwrap();
    let bytes = writer.into_inner().unwrap();
    let text = String::from_utf8(bytes).unwrap();
    assert_eq!(text, "a,\"b,c\",\"d\"\"e\"\n");

    let mut reader = CharReader::from_text(text.as_str());
    let records = tokenize_all(&mut reader, &Dialect::default());
    assert_eq!(records, vec![fields.to_vec()]);
}

#[test]
fn test_blank_line_distinction() {
    let dialect = Dialect::default();

    let mut reader = CharReader::from_text("\n");
    let records = tokenize_all(&mut reader, &dialect);
    assert_eq!(records, vec![Vec::<String>::new()]);

    let mut reader = CharReader::from_text(",\n");
    let records = tokenize_all(&mut reader, &dialect);
    assert_eq!(records, vec![vec![String::new(), String::new()]]);
}

#[test]
fn test_escape_detector_examples() {
    let limits = SampleLimits::default();
    let cancel = CancelToken::new();

    let mut reader = CharReader::from_text("a\\,b,c\n".repeat(10));
    let detection =
        detect_escape(&mut reader, ',', Some('"'), ESCAPE_CANDIDATES, &limits, &cancel).unwrap();
    assert_eq!(detection.escape, Some('\\'));
    assert!(detection.scores[0].1 > 0);

    let mut reader = CharReader::from_text("path,size\nc:\\temp\\x,12\nd:\\data\\y,15\n");
    let detection =
        detect_escape(&mut reader, ',', Some('"'), ESCAPE_CANDIDATES, &limits, &cancel).unwrap();
    assert_eq!(detection.escape, None);
}

#[test]
fn test_qualifier_detector_example() {
    let mut reader = CharReader::from_text("\"a\",\"b\",\"c\"\n\"d\",\"e\",\"f\"");
    let detection = detect_qualifier(
        &mut reader,
        ',',
        None,
        QUOTE_CANDIDATES,
        &SampleLimits::default(),
        &CancelToken::new(),
    )
    .unwrap();
    assert_eq!(detection.quote, Quote::Some('"'));
    let (quote, counts) = detection.counts[0];
    assert_eq!(quote, '"');
    assert_eq!(counts.opens, 6);
    assert_eq!(counts.closes, 6);
}

#[test]
fn test_sniff_preamble_and_tokenize() {
    let text = preamble_file();
    let mut reader = CharReader::from_text(text.as_str());
    let metadata = Sniffer::new().sniff(&mut reader).unwrap();

    assert_eq!(metadata.dialect.delimiter, ',');
    assert_eq!(metadata.dialect.skip_rows, 5);
    assert_eq!(metadata.dialect.record_delimiter, RecordDelimiter::Lf);

    let records = tokenize_all(&mut reader, &metadata.dialect);
    assert_eq!(records[0], vec!["id", "name", "city", "zip", "amount"]);
    assert_eq!(records.len(), 20);
    assert!(records.iter().all(|r| r.len() == 5));
}

#[test]
fn test_preamble_skip_matches_records_for_each_line_ending() {
    let mut lf = String::from("# exported\n# by the tool\n# on Monday\nSales report\n");
    lf.push_str("id,name,city,zip\n");
    for i in 1..=10 {
        lf.push_str(&format!("{i},Name{i},Lyon,690{i:02}\n"));
    }

    for (ending, style) in [
        ("\n", RecordDelimiter::Lf),
        ("\r", RecordDelimiter::Cr),
        ("\r\n", RecordDelimiter::CrLf),
        ("\n\r", RecordDelimiter::LfCr),
    ] {
        let text = lf.replace('\n', ending);
        let mut reader = CharReader::from_text(text.as_str());
        let metadata = Sniffer::new().sniff(&mut reader).unwrap();
        assert_eq!(metadata.dialect.record_delimiter, style);
        assert_eq!(metadata.dialect.comment.as_deref(), Some("#"), "{style}");
        assert_eq!(metadata.dialect.skip_rows, 4, "{style}");

        let records = tokenize_all(&mut reader, &metadata.dialect);
        assert_eq!(records[0], vec!["id", "name", "city", "zip"], "{style}");
        assert_eq!(records.len(), 11, "{style}");
    }
}

#[test]
fn test_lfcr_preamble_sniff_and_tokenize() {
    let text = preamble_file().replace('\n', "\n\r");
    let mut reader = CharReader::from_text(text.as_str());
    let metadata = Sniffer::new().sniff(&mut reader).unwrap();
    assert_eq!(metadata.dialect.record_delimiter, RecordDelimiter::LfCr);
    assert_eq!(metadata.dialect.skip_rows, 5);

    let records = tokenize_all(&mut reader, &metadata.dialect);
    assert_eq!(records[0], vec!["id", "name", "city", "zip", "amount"]);
    assert_eq!(records.len(), 20);
}

#[test]
fn test_sniff_path_with_tempfile() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(preamble_file().as_bytes()).unwrap();
    file.flush().unwrap();

    let metadata = Sniffer::new().sniff_path(file.path()).unwrap();
    assert_eq!(metadata.dialect.delimiter, ',');
    assert_eq!(metadata.dialect.skip_rows, 5);
}

#[test]
fn test_sniff_stream_then_tokenize() {
    let data = "name\tage\tcity\nAlice\t30\tNew York\nBob\t25\tLos Angeles\nCarol\t35\tChicago\n";
    let source = BufReader::with_capacity(3, Cursor::new(data.as_bytes()));
    let mut reader = CharReader::from_reader(source);

    let metadata = Sniffer::new().sniff(&mut reader).unwrap();
    assert_eq!(metadata.dialect.delimiter, '\t');

    let records = tokenize_all(&mut reader, &metadata.dialect);
    assert_eq!(records.len(), 4);
    assert_eq!(records[2], vec!["Bob", "25", "Los Angeles"]);
    assert!(!reader.is_rewindable());
}

#[test]
fn test_sniff_reader_cursor() {
    let data = b"a|b|c\n1|2|3\n4|5|6\n";
    let metadata = Sniffer::new().sniff_reader(Cursor::new(&data[..])).unwrap();
    assert_eq!(metadata.dialect.delimiter, '|');
}

#[test]
fn test_crlf_and_quoted_line_breaks() {
    let data = "id;note\r\n1;\"line one\r\nline two\"\r\n2;plain\r\n3;x\r\n";
    let mut reader = CharReader::from_text(data);
    let metadata = Sniffer::new().sniff(&mut reader).unwrap();
    assert_eq!(metadata.dialect.delimiter, ';');
    assert_eq!(metadata.dialect.record_delimiter, RecordDelimiter::CrLf);

    let records = tokenize_all(&mut reader, &metadata.dialect);
    assert_eq!(records[1], vec!["1", "line one\r\nline two"]);
    assert_eq!(records.len(), 4);
}

#[test]
fn test_escaped_delimiters_end_to_end() {
    let data = "a\\,b,c\n".repeat(10);
    let mut reader = CharReader::from_text(data.as_str());
    let metadata = Sniffer::new().sniff(&mut reader).unwrap();
    assert_eq!(metadata.dialect.delimiter, ',');
    assert_eq!(metadata.dialect.escape, Some('\\'));

    let records = tokenize_all(&mut reader, &metadata.dialect);
    assert_eq!(records[0], vec!["a,b", "c"]);
}

#[test]
fn test_comment_lines() {
    let data = "# exported\n# by the tool\n# on Monday\nid,name\n1,a\n2,b\n3,c\n";
    let mut reader = CharReader::from_text(data);
    let metadata = Sniffer::new().sniff(&mut reader).unwrap();
    assert_eq!(metadata.dialect.comment.as_deref(), Some("#"));

    let records = tokenize_all(&mut reader, &metadata.dialect);
    assert_eq!(records[0], vec!["id", "name"]);
    assert_eq!(records.len(), 4);
}

#[test]
fn test_comment_validator_rejects_marker() {
    let data = "#a,b,c,d,e,f,g,h,i\n1,2\n3,4\n5,6\n";
    let metadata = Sniffer::new().sniff_str(data).unwrap();
    assert_eq!(metadata.dialect.comment, None);
}

#[test]
fn test_sniff_bytes_utf16_with_bom() {
    let mut data = vec![0xFF, 0xFE];
    for unit in "a;b\n1;2\n3;4\n".encode_utf16() {
        data.extend_from_slice(&unit.to_le_bytes());
    }
    let metadata = Sniffer::new().sniff_bytes(&data).unwrap();
    assert_eq!(metadata.dialect.delimiter, ';');
}

#[test]
fn test_sniff_bytes_utf8_bom() {
    let data = b"\xEF\xBB\xBFx|y\n1|2\n3|4\n";
    let metadata = Sniffer::new().sniff_bytes(data).unwrap();
    assert_eq!(metadata.dialect.delimiter, '|');
}

#[test]
fn test_empty_input_is_error() {
    assert!(matches!(
        Sniffer::new().sniff_bytes(b""),
        Err(SnifferError::EmptyData)
    ));
}

#[test]
fn test_cancellation() {
    let cancel = CancelToken::new();
    cancel.cancel();

    let metadata = Sniffer::new()
        .cancel_token(cancel.clone())
        .sniff_str("a;b\n1;2\n3;4\n");
    assert!(metadata.is_ok());

    let mut reader = CharReader::from_text("a,b\n1,2\n");
    let mut tokenizer = Tokenizer::from_start(&mut reader, &Dialect::default())
        .unwrap()
        .with_cancel(cancel);
    assert!(matches!(
        tokenizer.next(),
        Some(Err(SnifferError::Cancelled))
    ));
}

#[test]
fn test_rewind_idempotence_on_stream() {
    let data = "x,y\nz\u{00e9},w\r\nlast";
    let mut reader = CharReader::from_reader(BufReader::with_capacity(1, data.as_bytes()));
    for _ in 0..3 {
        reader.to_beginning().unwrap();
        let mut seen = String::new();
        while let Some(c) = reader.read().unwrap() {
            seen.push(c);
        }
        assert_eq!(seen, data);
    }
}

#[test]
fn test_sampler_visits_every_line_once() {
    let mut reader = CharReader::from_text("r1\nr2\nr3\nr4\n");
    reader.read_line().unwrap();
    reader.read_line().unwrap();

    let mut sampler = Sampler::new(&mut reader);
    let mut seen = Vec::new();
    while let Some(line) = sampler.read_line().unwrap() {
        seen.push(line);
    }
    assert_eq!(seen, vec!["r3", "r4", "r1", "r2"]);
}

#[test]
fn test_realigner_example() {
    let mut realigner = RowRealigner::with_seed(3, 11);
    realigner.accept(&["12".to_string(), "2020-01-01".to_string(), "Acme".to_string()]);

    let malformed = vec![
        "12".to_string(),
        "2020-01-01".to_string(),
        "Ac".to_string(),
        "me".to_string(),
    ];
    let realigned = realigner.process(malformed);
    assert_eq!(realigned.fields, vec!["12", "2020-01-01", "Ac me"]);
    assert_eq!(realigned.warnings.len(), 1);
}

#[test]
fn test_realign_tokenized_rows() {
    let data = "1,Jones,2020-01-01\n2,Brown,2020-02-01\n3,White,2020-03-01\n4,Acme, Inc,2020-04-01\n";
    let mut reader = CharReader::from_text(data);

    let mut realigner = RowRealigner::with_seed(3, 5);
    let mut output = Vec::new();
    for record in Tokenizer::from_start(&mut reader, &Dialect::default()).unwrap() {
        output.push(realigner.process(record.unwrap()));
    }

    let last = &output[3];
    assert_eq!(last.fields.len(), 3);
    assert_eq!(
        last.fields[1].split_whitespace().collect::<Vec<_>>(),
        vec!["Acme", "Inc"]
    );
    assert_eq!(last.fields[2], "2020-04-01");
    assert_eq!(last.warnings.len(), 1);
    assert_eq!(last.warnings[0].column, 2);
    assert!(output[..3].iter().all(|r| r.warnings.is_empty()));
}
