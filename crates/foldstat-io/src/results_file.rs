//! Reading and writing per-fold prediction files.
//!
//! ```text
//! dataset,classifier,split[,foldId,timeUnit,fileType,description...]
//! parameter info (opaque, optionally BuildTime,<t>,...)
//! accuracy[,buildTime,testTime,benchmarkTime,memory,numClasses,estMethod,estTime,buildPlusEst]
//! actual,predicted,,p_0,...,p_{C-1},,predTime,,description
//! ```

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

use foldstat_core::{FoldError, FoldHeader, FoldResult, ParseError, PredictionRecord, Split, TimeUnit};
use foldstat_metrics::fold_metrics;
use tracing::{debug, warn};

type ParseResult<T> = Result<T, ParseError>;

/// Tolerance between the accuracy written on line 3 and the one recomputed from predictions.
pub const ACCURACY_TOLERANCE: f64 = 1e-8;

const PREDICTIONS_FILE_TYPE: &str = "PREDICTIONS";

/// Read one fold file from disk.
///
/// An absent or zero-length file is `Missing`; anything that fails to parse is `Corrupt`.
pub fn read_results_file(path: &Path) -> Result<FoldResult, FoldError> {
    let missing = || FoldError::Missing {
        path: path.to_path_buf(),
    };
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(missing()),
        Err(e) => {
            return Err(FoldError::Corrupt {
                path: path.to_path_buf(),
                source: ParseError::Io(e.to_string()),
            })
        }
    };
    if file.metadata().map(|m| m.len() == 0).unwrap_or(false) {
        return Err(missing());
    }

    debug!(path = %path.display(), "parsing fold file");
    parse_results(BufReader::new(file)).map_err(|source| match source {
        ParseError::Empty => missing(),
        source => FoldError::Corrupt {
            path: path.to_path_buf(),
            source,
        },
    })
}

/// Parse a fold file from any buffered reader.
///
/// Predictions are consumed line by line and dropped once the fold's metrics
/// have been computed.
pub fn parse_results<R: BufRead>(reader: R) -> ParseResult<FoldResult> {
    let mut lines = reader
        .lines()
        .enumerate()
        .map(|(i, line)| line.map(|l| (i + 1, l)).map_err(|e| ParseError::Io(e.to_string())));

    let mut header = FoldHeader::default();

    let (_, first) = lines.next().transpose()?.ok_or(ParseError::Empty)?;
    parse_first_line(&first, &mut header)?;
    let (line_no, second) = lines.next().transpose()?.ok_or(ParseError::TooFewLines { found: 1 })?;
    parse_second_line(line_no, &second, &mut header)?;
    let (line_no, third) = lines.next().transpose()?.ok_or(ParseError::TooFewLines { found: 2 })?;
    parse_third_line(line_no, &third, &mut header)?;

    let mut records = Vec::new();
    let mut expected = header.declared_classes.filter(|&c| c > 0);

    for line in lines {
        let (line_no, text) = line?;
        if text.trim().is_empty() {
            continue;
        }
        let record = parse_prediction(line_no, &text, header.time_unit)?;
        let num_classes = *expected.get_or_insert(record.num_classes());
        if record.num_classes() != num_classes || num_classes < 2 {
            return Err(ParseError::ProbabilityCount {
                line: line_no,
                expected: num_classes.max(2),
                found: record.num_classes(),
            });
        }
        for index in [record.actual_class, record.predicted_class] {
            if index >= num_classes {
                return Err(ParseError::ClassOutOfRange {
                    line: line_no,
                    index,
                    num_classes,
                });
            }
        }
        let sum: f64 = record.probabilities.iter().sum();
        if (sum - 1.0).abs() > 1e-3 {
            warn!(line = line_no, sum, "class probabilities do not sum to one");
        }
        records.push(record);
    }

    if records.is_empty() {
        return Err(ParseError::TooFewLines { found: 3 });
    }

    let num_classes = expected.unwrap_or(0);
    let metrics = fold_metrics(&records, num_classes);
    if (metrics.accuracy - header.reported_accuracy).abs() > ACCURACY_TOLERANCE {
        return Err(ParseError::AccuracyMismatch {
            reported: header.reported_accuracy,
            computed: metrics.accuracy,
        });
    }
    header.declared_classes = Some(num_classes);
    Ok(FoldResult::new(header, metrics))
}

fn parse_first_line(line: &str, header: &mut FoldHeader) -> ParseResult<()> {
    let parts: Vec<&str> = line.split(',').collect();
    // single field: an old-style file carrying only the classifier name
    if parts.len() == 1 {
        header.classifier = parts[0].trim().to_string();
        return Ok(());
    }
    header.dataset = parts[0].trim().to_string();
    header.classifier = parts[1].trim().to_string();
    if let Some(split) = parts.get(2).filter(|s| !s.trim().is_empty()) {
        header.split = Some(split.parse::<Split>()?);
    }
    if let Some(fold) = parts.get(3).filter(|s| !s.trim().is_empty()) {
        header.fold_id = Some(parse_num(1, "foldId", fold)?);
    }
    if let Some(unit) = parts.get(4).filter(|s| !s.trim().is_empty()) {
        header.time_unit = unit.parse::<TimeUnit>()?;
    }
    if let Some(kind) = parts.get(5).map(|s| s.trim()).filter(|s| !s.is_empty()) {
        if !kind.eq_ignore_ascii_case(PREDICTIONS_FILE_TYPE) {
            return Err(ParseError::UnsupportedFileType(kind.to_string()));
        }
    }
    if parts.len() > 6 {
        header.description = Some(parts[6..].join(",").trim().to_string());
    }
    Ok(())
}

fn parse_second_line(line_no: usize, line: &str, header: &mut FoldHeader) -> ParseResult<()> {
    header.parameter_info = line.to_string();
    let parts: Vec<&str> = line.split(',').map(str::trim).collect();
    if !parts[0].contains("BuildTime") {
        return Ok(());
    }
    if let Some(raw) = parts.get(1) {
        header.build_time_millis = parse_time(line_no, "buildTime", raw, header.time_unit)?;
    }
    // field 3 is only a train estimate when it reads as a number
    header.train_cv_accuracy = parts.get(3).and_then(|s| s.parse::<f64>().ok());
    let mut i = 4;
    while i + 1 < parts.len() {
        if !parts[i].is_empty() {
            header.parameters.insert(parts[i].to_string(), parts[i + 1].to_string());
        }
        i += 2;
    }
    Ok(())
}

fn parse_third_line(line_no: usize, line: &str, header: &mut FoldHeader) -> ParseResult<()> {
    let parts: Vec<&str> = line.split(',').map(str::trim).collect();
    let unit = header.time_unit;
    header.reported_accuracy = parse_num(line_no, "accuracy", parts[0])?;

    if let Some(raw) = parts.get(1) {
        if let Some(t) = parse_time(line_no, "buildTime", raw, unit)? {
            header.build_time_millis = Some(t);
        }
    }
    if let Some(raw) = parts.get(2) {
        header.test_time_millis = parse_time(line_no, "testTime", raw, unit)?;
    }
    if let Some(raw) = parts.get(3) {
        header.benchmark_time_millis = parse_time(line_no, "benchmarkTime", raw, unit)?;
    }
    if let Some(raw) = parts.get(4) {
        header.memory_usage = parse_optional(line_no, "memoryUsage", raw)?;
    }
    if let Some(raw) = parts.get(5) {
        header.declared_classes = parse_optional(line_no, "numClasses", raw)?.map(|c| c as usize);
    }
    if let Some(method) = parts.get(6).filter(|s| !s.is_empty() && **s != "null") {
        header.error_estimate_method = Some(method.to_string());
    }
    if let Some(raw) = parts.get(7) {
        header.error_estimate_time_millis = parse_time(line_no, "errorEstimateTime", raw, unit)?;
    }
    if let Some(raw) = parts.get(8) {
        header.build_plus_estimate_time_millis =
            parse_time(line_no, "buildPlusEstimateTime", raw, unit)?;
    }
    Ok(())
}

fn parse_prediction(line_no: usize, line: &str, unit: TimeUnit) -> ParseResult<PredictionRecord> {
    let parts: Vec<&str> = line.split(',').map(str::trim).collect();
    if parts.len() < 3 {
        return Err(ParseError::ProbabilityCount {
            line: line_no,
            expected: 2,
            found: parts.len().saturating_sub(2),
        });
    }
    let actual = parse_class(line_no, "actual class", parts[0])?;
    let predicted = parse_class(line_no, "predicted class", parts[1])?;

    let mut i = 2;
    if parts[i].is_empty() {
        i += 1;
    }
    let mut probabilities = Vec::new();
    while i < parts.len() && !parts[i].is_empty() {
        let value: f64 = parse_num(line_no, "probability", parts[i])?;
        // NaN fails the range check too
        if !(0.0..=1.0).contains(&value) {
            return Err(ParseError::InvalidProbability { line: line_no, value });
        }
        probabilities.push(value);
        i += 1;
    }

    let mut record = PredictionRecord::new(actual, predicted, probabilities);

    // `,,predTime,,description`
    if i + 1 < parts.len() {
        record.prediction_time = parse_time(line_no, "predictionTime", parts[i + 1], unit)?;
        i += 2;
    }
    if i + 1 < parts.len() {
        let description = parts[i + 1..].join(",");
        if !description.is_empty() {
            record.description = Some(description);
        }
    }
    Ok(record)
}

fn parse_num<T: std::str::FromStr>(line: usize, field: &'static str, raw: &str) -> ParseResult<T> {
    raw.trim().parse::<T>().map_err(|_| ParseError::InvalidNumber {
        line,
        field,
        value: raw.to_string(),
    })
}

fn parse_class(line: usize, field: &'static str, raw: &str) -> ParseResult<usize> {
    // some writers emit class values as doubles
    let value: f64 = parse_num(line, field, raw)?;
    if value < 0.0 || value.fract() != 0.0 {
        return Err(ParseError::InvalidNumber {
            line,
            field,
            value: raw.to_string(),
        });
    }
    Ok(value as usize)
}

/// Empty or negative means unset.
fn parse_optional(line: usize, field: &'static str, raw: &str) -> ParseResult<Option<u64>> {
    if raw.trim().is_empty() || raw.trim() == "null" {
        return Ok(None);
    }
    let value: f64 = parse_num(line, field, raw)?;
    if value < 0.0 {
        Ok(None)
    } else {
        Ok(Some(value as u64))
    }
}

fn parse_time(line: usize, field: &'static str, raw: &str, unit: TimeUnit) -> ParseResult<Option<u64>> {
    Ok(parse_optional(line, field, raw)?.map(|t| unit.to_millis(t)))
}

/// Write a fold file in the format [`parse_results`] reads, timings in milliseconds.
pub fn write_results<W: Write>(
    mut out: W,
    header: &FoldHeader,
    records: &[PredictionRecord],
) -> io::Result<()> {
    let split = header.split.map(|s| s.to_string()).unwrap_or_default();
    let fold = header.fold_id.map(|f| f.to_string()).unwrap_or_default();
    writeln!(
        out,
        "{},{},{},{},MILLISECONDS,{},{}",
        header.dataset,
        header.classifier,
        split,
        fold,
        PREDICTIONS_FILE_TYPE,
        header.description.as_deref().unwrap_or("")
    )?;
    writeln!(out, "{}", header.parameter_info)?;

    let num_classes = records.first().map(|r| r.num_classes()).unwrap_or(0);
    let correct = records.iter().filter(|r| r.is_correct()).count();
    let accuracy = if records.is_empty() {
        0.0
    } else {
        correct as f64 / records.len() as f64
    };
    let time = |t: Option<u64>| t.map(|v| v as i64).unwrap_or(-1);
    writeln!(
        out,
        "{},{},{},{},{},{},{},{},{}",
        accuracy,
        time(header.build_time_millis),
        time(header.test_time_millis),
        time(header.benchmark_time_millis),
        time(header.memory_usage),
        num_classes,
        header.error_estimate_method.as_deref().unwrap_or(""),
        time(header.error_estimate_time_millis),
        time(header.build_plus_estimate_time_millis),
    )?;

    for r in records {
        write!(out, "{},{},", r.actual_class, r.predicted_class)?;
        for p in &r.probabilities {
            write!(out, ",{p}")?;
        }
        writeln!(
            out,
            ",,{},,{}",
            time(r.prediction_time),
            r.description.as_deref().unwrap_or("")
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const SAMPLE: &str = "\
iris,RotF,test,0,MILLISECONDS,PREDICTIONS, rotation forest
BuildTime,1200,TrainAcc,0.95,numTrees,200,maxDepth,10
0.75,1500,30,-1,2048,3,,-1,-1
0,0,,0.8,0.1,0.1,,4,,
1,1,,0.2,0.7,0.1,,6,,
2,2,,0.1,0.2,0.7,,5,,
2,1,,0.1,0.5,0.4,,3,,
";

    fn parse(text: &str) -> ParseResult<FoldResult> {
        parse_results(Cursor::new(text))
    }

    #[test]
    fn test_parse_full_file() {
        let fold = parse(SAMPLE).unwrap();
        let header = fold.header();
        assert_eq!(fold.dataset(), "iris");
        assert_eq!(fold.classifier(), "RotF");
        assert_eq!(header.split, Some(Split::Test));
        assert_eq!(header.fold_id, Some(0));
        assert_eq!(header.description.as_deref(), Some("rotation forest"));
        // third line overrides the build time on line 2
        assert_eq!(fold.build_time_millis(), Some(1500));
        assert_eq!(header.test_time_millis, Some(30));
        assert_eq!(header.benchmark_time_millis, None);
        assert_eq!(header.memory_usage, Some(2048));
        assert_eq!(fold.train_cv_accuracy(), Some(0.95));
        assert_eq!(fold.parameters().get("numTrees").map(String::as_str), Some("200"));
        assert_eq!(fold.parameters().get("maxDepth").map(String::as_str), Some("10"));
        assert_eq!(fold.metrics().num_instances, 4);
        assert_eq!(fold.metrics().num_classes, 3);
        assert_eq!(fold.accuracy(), 0.75);
        assert_eq!(fold.metrics().median_prediction_time, Some(4));
    }

    #[test]
    fn test_minimal_file_without_separators() {
        let text = "d,c,test\nparams\n0.5\n0,0,0.6,0.4\n1,0,0.7,0.3\n";
        let fold = parse(text).unwrap();
        assert_eq!(fold.accuracy(), 0.5);
        assert_eq!(fold.metrics().num_classes, 2);
        assert_eq!(fold.header().time_unit, TimeUnit::Milliseconds);
        assert_eq!(fold.build_time_millis(), None);
    }

    #[test]
    fn test_time_unit_conversion() {
        let text = "d,c,test,1,NANOSECONDS\np\n1.0,5000000\n0,0,,0.9,0.1\n";
        let fold = parse(text).unwrap();
        assert_eq!(fold.build_time_millis(), Some(5));
    }

    #[test]
    fn test_empty_and_short_files() {
        assert_eq!(parse(""), Err(ParseError::Empty));
        assert_eq!(parse("d,c,test\np\n0.5\n"), Err(ParseError::TooFewLines { found: 3 }));
        assert_eq!(parse("d,c,test\n"), Err(ParseError::TooFewLines { found: 1 }));
        assert_eq!(parse("d,c,test\n\n0.5\n\n"), Err(ParseError::TooFewLines { found: 3 }));
    }

    #[test]
    fn test_probability_count_mismatch() {
        let text = "d,c,test\np\n1.0\n0,0,,0.9,0.1\n1,1,,0.1,0.8,0.1\n";
        assert_eq!(
            parse(text),
            Err(ParseError::ProbabilityCount {
                line: 5,
                expected: 2,
                found: 3
            })
        );
    }

    #[test]
    fn test_declared_class_count_is_enforced() {
        let text = "d,c,test\np\n1.0,-1,-1,-1,-1,3\n0,0,,0.9,0.1\n";
        assert!(matches!(parse(text), Err(ParseError::ProbabilityCount { expected: 3, .. })));
    }

    #[test]
    fn test_single_probability_rejected() {
        let text = "d,c,test\np\n1.0\n0,0,,1.0\n";
        assert!(matches!(parse(text), Err(ParseError::ProbabilityCount { .. })));
    }

    #[test]
    fn test_malformed_number() {
        let text = "d,c,test\np\n1.0\n0,0,,0.9,abc\n";
        assert!(matches!(
            parse(text),
            Err(ParseError::InvalidNumber { line: 4, field: "probability", .. })
        ));
        let text = "d,c,test\np\nhigh\n0,0,,0.9,0.1\n";
        assert!(matches!(parse(text), Err(ParseError::InvalidNumber { field: "accuracy", .. })));
    }

    #[test]
    fn test_nan_probability_rejected() {
        let text = "d,c,test\np\n0.5\n0,0,,NaN,NaN\n1,0,,0.7,0.3\n";
        match parse(text) {
            Err(ParseError::InvalidProbability { line: 4, value }) => assert!(value.is_nan()),
            other => panic!("unexpected {other:?}"),
        }
        let text = "d,c,test\np\n1.0\n0,0,,inf,0.0\n";
        assert!(matches!(parse(text), Err(ParseError::InvalidProbability { line: 4, .. })));
    }

    #[test]
    fn test_probability_outside_unit_interval_rejected() {
        let text = "d,c,test\np\n1.0\n1,1,,1.2,-0.2\n";
        assert_eq!(
            parse(text),
            Err(ParseError::InvalidProbability { line: 4, value: 1.2 })
        );
        let text = "d,c,test\np\n1.0\n1,1,,0.2,-0.2\n";
        assert_eq!(
            parse(text),
            Err(ParseError::InvalidProbability { line: 4, value: -0.2 })
        );
    }

    #[test]
    fn test_bad_probability_file_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("testFold0.csv");
        std::fs::write(&path, "d,c,test\np\n0.5\n0,0,,NaN,NaN\n1,0,,0.7,0.3\n").unwrap();
        let err = read_results_file(&path).unwrap_err();
        assert!(err.is_corrupt());
    }

    #[test]
    fn test_seven_of_ten_correct_gives_exact_accuracy() {
        let mut text = String::from("d,c,test,0\np\n0.7\n");
        for i in 0..10 {
            let predicted = if i < 7 { i % 2 } else { 1 - i % 2 };
            let probs = if predicted == 0 { "0.6,0.4" } else { "0.4,0.6" };
            text.push_str(&format!("{},{predicted},,{probs}\n", i % 2));
        }
        let fold = parse(&text).unwrap();
        assert_eq!(fold.accuracy(), 0.7);
        assert_eq!(fold.metrics().num_instances, 10);
    }

    #[test]
    fn test_class_out_of_range() {
        let text = "d,c,test\np\n0.0\n2,0,,0.9,0.1\n";
        assert!(matches!(parse(text), Err(ParseError::ClassOutOfRange { index: 2, .. })));
    }

    #[test]
    fn test_accuracy_mismatch() {
        let text = "d,c,test\np\n0.9\n0,0,,0.9,0.1\n1,0,,0.6,0.4\n";
        assert!(matches!(parse(text), Err(ParseError::AccuracyMismatch { .. })));
    }

    #[test]
    fn test_unsupported_file_type() {
        let text = "d,c,test,0,MILLISECONDS,METRICS,\np\n1.0\n0,0,,0.9,0.1\n";
        assert_eq!(
            parse(text),
            Err(ParseError::UnsupportedFileType("METRICS".into()))
        );
    }

    #[test]
    fn test_read_file_missing_and_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("testFold0.csv");
        assert!(matches!(read_results_file(&path), Err(FoldError::Missing { .. })));

        std::fs::write(&path, "").unwrap();
        assert!(matches!(read_results_file(&path), Err(FoldError::Missing { .. })));

        std::fs::write(&path, "d,c,test\np\n").unwrap();
        let err = read_results_file(&path).unwrap_err();
        assert!(err.is_corrupt());
        assert_eq!(err.path(), &path);
    }

    #[test]
    fn test_written_file_parses_back() {
        let header = FoldHeader {
            dataset: "wine".into(),
            classifier: "RandF".into(),
            split: Some(Split::Test),
            fold_id: Some(3),
            parameter_info: "BuildTime,10".into(),
            build_time_millis: Some(10),
            ..FoldHeader::default()
        };
        let mut records = vec![
            PredictionRecord::new(0, 0, vec![0.6, 0.4]),
            PredictionRecord::new(1, 0, vec![0.55, 0.45]),
            PredictionRecord::new(1, 1, vec![0.2, 0.8]),
        ];
        records[0].prediction_time = Some(2);

        let mut buf = Vec::new();
        write_results(&mut buf, &header, &records).unwrap();
        let fold = parse_results(Cursor::new(buf)).unwrap();
        assert_eq!(fold.dataset(), "wine");
        assert_eq!(fold.header().fold_id, Some(3));
        assert_eq!(fold.build_time_millis(), Some(10));
        assert!((fold.accuracy() - 2.0 / 3.0).abs() < 1e-12);
    }
}
