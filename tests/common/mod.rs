// Shared fixtures: in-memory .ipa archives carrying plist descriptors.

#![allow(dead_code)]

use std::io::{Cursor, Write};

use plist::{Dictionary, Value};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Binary-encoded Info.plist with the given string fields.
pub fn info_plist(pairs: &[(&str, &str)]) -> Vec<u8> {
    let mut dict = Dictionary::new();
    for (k, v) in pairs {
        dict.insert((*k).to_string(), Value::String((*v).to_string()));
    }
    let mut buf = Vec::new();
    Value::Dictionary(dict).to_writer_binary(&mut buf).unwrap();
    buf
}

/// Zip archive holding `entries` in the given order.
pub fn zip_with(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Minimal .ipa whose bundle descriptor carries `pairs`.
pub fn ipa_with(pairs: &[(&str, &str)]) -> Vec<u8> {
    let plist = info_plist(pairs);
    zip_with(&[
        ("Payload/Acme.app/Acme", b"\xCA\xFE\xBA\xBE".as_slice()),
        ("Payload/Acme.app/Info.plist", plist.as_slice()),
    ])
}

pub fn acme_ipa() -> Vec<u8> {
    ipa_with(&[
        ("CFBundleIdentifier", "com.acme.app"),
        ("CFBundleShortVersionString", "2.1"),
        ("CFBundleDisplayName", "Acme"),
    ])
}
