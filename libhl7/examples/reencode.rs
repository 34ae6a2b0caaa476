//! Decode every message fixture and write it back with the default
//! separators, showing how a message looks after normalization.

use libhl7::{decode, encode, parse_schema};
use std::fs;
use std::path::Path;

fn main() {
    let test_dir = Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .join("test");

    let mut passed = 0;
    let mut failed = 0;

    let mut paths: Vec<_> = fs::read_dir(test_dir.join("hl7"))
        .unwrap()
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.extension().map(|e| e == "hl7").unwrap_or(false))
        .collect();
    paths.sort();

    for path in paths {
        let basename = path.file_stem().unwrap().to_str().unwrap();
        let input = fs::read_to_string(&path).unwrap();
        let schema_path = test_dir.join("schema").join(format!("{}.json", basename));
        let schema = match fs::read_to_string(&schema_path).map(|s| parse_schema(&s)) {
            Ok(Ok(schema)) => schema,
            Ok(Err(e)) => {
                failed += 1;
                println!("Schema error for {}: {}", basename, e);
                continue;
            }
            Err(e) => {
                failed += 1;
                println!("Missing schema for {}: {}", basename, e);
                continue;
            }
        };

        match decode(&input, &schema).and_then(|message| encode(&message, &schema)) {
            Ok(text) => {
                passed += 1;
                println!("{}:", basename);
                for segment in text.split('\r') {
                    println!("  {}", segment);
                }
            }
            Err(e) => {
                failed += 1;
                println!("FAIL: {}: {}", basename, e);
            }
        }
    }

    println!("\nResults: {} passed, {} failed", passed, failed);
}
