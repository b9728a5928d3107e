// Loading FIBEX descriptions from disk and decoding with them
use dlt_trace_decoder::{
    Argument, Decoder, DecoderConfig, DltType, FibexFile, FibexOptions, FibexWarning, TraceLine,
};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

const HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<fx:FIBEX xmlns:fx="http://www.asam.net/xml/fbx" xmlns:ho="http://www.asam.net/xml" VERSION="3.1.0">
<fx:PROJECT ID="projectTCB"><ho:SHORT-NAME>projectTCB</ho:SHORT-NAME></fx:PROJECT>
<fx:ELEMENTS>
<fx:ECUS><fx:ECU ID="TCB"><ho:SHORT-NAME>TCB</ho:SHORT-NAME></fx:ECU></fx:ECUS>
"#;

const FOOTER: &str = "</fx:ELEMENTS>\n</fx:FIBEX>\n";

fn pdu(id: &str, desc: Option<&str>, length: u32, signal: Option<&str>) -> String {
    let mut xml = format!(r#"<fx:PDU ID="{}"><ho:SHORT-NAME>{}</ho:SHORT-NAME>"#, id, id);
    if let Some(desc) = desc {
        xml.push_str(&format!("<ho:DESC>{}</ho:DESC>", desc));
    }
    xml.push_str(&format!("<fx:BYTE-LENGTH>{}</fx:BYTE-LENGTH><fx:PDU-TYPE>OTHER</fx:PDU-TYPE>", length));
    if let Some(signal) = signal {
        xml.push_str(&format!(
            r#"<fx:SIGNAL-INSTANCES><fx:SIGNAL-INSTANCE ID="S_{id}"><fx:SEQUENCE-NUMBER>0</fx:SEQUENCE-NUMBER><fx:SIGNAL-REF ID-REF="{signal}"/></fx:SIGNAL-INSTANCE></fx:SIGNAL-INSTANCES>"#
        ));
    }
    xml.push_str("</fx:PDU>\n");
    xml
}

fn frame(id: u32, app: &str, ctx: &str, info: &str, pdus: &[String]) -> String {
    let mut xml = format!(
        r#"<fx:FRAME ID="ID_{id}"><ho:SHORT-NAME>ID_{id}</ho:SHORT-NAME><fx:BYTE-LENGTH>0</fx:BYTE-LENGTH><fx:FRAME-TYPE>OTHER</fx:FRAME-TYPE><fx:PDU-INSTANCES>"#
    );
    for (seq, pdu) in pdus.iter().enumerate() {
        xml.push_str(&format!(
            r#"<fx:PDU-INSTANCE ID="P_{id}_{seq}"><fx:PDU-REF ID-REF="{pdu}"/><fx:SEQUENCE-NUMBER>{seq}</fx:SEQUENCE-NUMBER></fx:PDU-INSTANCE>"#
        ));
    }
    xml.push_str(&format!(
        "</fx:PDU-INSTANCES><fx:MANUFACTURER-EXTENSION>\
         <SOURCE_FILE>tcb.c</SOURCE_FILE><LINE_NUMBER>{id}</LINE_NUMBER>\
         <APPLICATION_ID>{app}</APPLICATION_ID><CONTEXT_ID>{ctx}</CONTEXT_ID>\
         <MESSAGE_TYPE>DLT_TYPE_LOG</MESSAGE_TYPE><MESSAGE_INFO>{info}</MESSAGE_INFO>\
         </fx:MANUFACTURER-EXTENSION></fx:FRAME>\n"
    ));
    xml
}

/// Five frames, ID_10 to ID_14, for the TCB ECU
fn tcb_fibex() -> String {
    let mut xml = String::from(HEADER);
    xml.push_str("<fx:PDUS>\n");
    for id in 10..15 {
        xml.push_str(&pdu(&format!("PDU_{}_0", id), Some("Temperature:"), 0, None));
        xml.push_str(&pdu(&format!("PDU_{}_1", id), None, 4, Some("S_UINT32")));
    }
    xml.push_str("</fx:PDUS>\n<fx:FRAMES>\n");
    for id in 10..15 {
        let pdus = vec![format!("PDU_{}_0", id), format!("PDU_{}_1", id)];
        xml.push_str(&frame(id, "APP1", "CTX1", "DLT_LOG_INFO", &pdus));
    }
    xml.push_str("</fx:FRAMES>\n");
    xml.push_str(FOOTER);
    xml
}

/// A second description reusing ID_10 for the same application and context
fn duplicate_fibex() -> String {
    let mut xml = String::from(HEADER);
    xml.push_str("<fx:PDUS>\n");
    xml.push_str(&pdu("PDU_10_0", None, 1, Some("S_BOOL")));
    xml.push_str(&pdu("PDU_20_0", None, 2, Some("S_SINT16")));
    xml.push_str("</fx:PDUS>\n<fx:FRAMES>\n");
    xml.push_str(&frame(10, "APP1", "CTX1", "DLT_LOG_WARN", &["PDU_10_0".to_string()]));
    xml.push_str(&frame(20, "APP2", "CTX2", "DLT_LOG_WARN", &["PDU_20_0".to_string()]));
    xml.push_str("</fx:FRAMES>\n");
    xml.push_str(FOOTER);
    xml
}

fn collecting(options: FibexOptions) -> (FibexFile, Arc<Mutex<Vec<FibexWarning>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let fibex =
        FibexFile::new(options).with_warning_handler(move |event| sink.lock().unwrap().push(event.warning));
    (fibex, seen)
}

fn write(dir: &Path, name: &str, contents: &str) {
    fs::write(dir.join(name), contents).unwrap();
}

#[test]
fn test_load_file() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "tcb.xml", &tcb_fibex());

    let (mut fibex, warnings) = collecting(FibexOptions::default());
    assert!(fibex.load_file(dir.path().join("tcb.xml")).unwrap());
    assert!(warnings.lock().unwrap().is_empty());

    for id in 10..15 {
        let frame = fibex
            .try_get_frame(id, Some("APP1"), Some("CTX1"), None)
            .unwrap_or_else(|| panic!("ID_{} not loaded", id));
        assert_eq!(frame.id, id);
        assert_eq!(frame.ecu_id.as_deref(), Some("TCB"));
        assert_eq!(frame.message_type, DltType::LogInfo);
        assert_eq!(frame.arguments.len(), 2);
        assert_eq!(frame.arguments[1].pdu_type, "S_UINT32");
        assert_eq!(frame.arguments[1].pdu_length, 4);
    }

    // Found by id alone as well
    assert!(fibex.try_get_frame(12, None, None, None).is_some());
    assert!(fibex.try_get_frame(15, None, None, None).is_none());
    assert!(fibex.try_get_frame(10, Some("APP1"), Some("CTX2"), None).is_none());
}

#[test]
fn test_load_dir_reports_duplicates() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a_tcb.xml", &tcb_fibex());
    write(dir.path(), "b_duplicate.xml", &duplicate_fibex());
    write(dir.path(), "notes.txt", "not a description");

    let (mut fibex, warnings) = collecting(FibexOptions::default());
    assert!(!fibex.load_dir(dir.path()).unwrap());
    assert_eq!(*warnings.lock().unwrap(), vec![FibexWarning::DuplicateEntry]);
    assert_eq!(fibex.warning_count(), 1);

    // The first description of ID_10 stays, the new frame of the second file is added
    let first = fibex.try_get_frame(10, Some("APP1"), Some("CTX1"), None).unwrap();
    assert_eq!(first.message_type, DltType::LogInfo);
    let added = fibex.try_get_frame(20, Some("APP2"), Some("CTX2"), None).unwrap();
    assert_eq!(added.message_type, DltType::LogWarn);
}

#[test]
fn test_load_path_with_ecu_key() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "tcb.xml", &tcb_fibex());

    let (mut fibex, _) = collecting(FibexOptions::new().with_ecu_id(true));
    assert!(fibex.load_path(dir.path()).unwrap());
    assert!(fibex.try_get_frame(11, Some("APP1"), Some("CTX1"), Some("TCB")).is_some());
    assert!(fibex.try_get_frame(11, Some("APP1"), Some("CTX1"), Some("ECU1")).is_none());
}

#[test]
fn test_missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut fibex = FibexFile::new(FibexOptions::default());
    assert!(fibex.load_file(dir.path().join("missing.xml")).is_err());
}

fn non_verbose_packet(message_id: u32, payload: &[u8]) -> Vec<u8> {
    let mut body = message_id.to_le_bytes().to_vec();
    body.extend_from_slice(payload);

    let mut bytes = b"DLT\x01".to_vec();
    bytes.extend_from_slice(&1_700_000_000u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(b"TCB\0");
    let length = (4 + 4 + 10 + body.len()) as u16;
    // UEH | WEID, version 1
    bytes.push(0x01 | 0x04 | 0x20);
    bytes.push(0);
    bytes.extend_from_slice(&length.to_be_bytes());
    bytes.extend_from_slice(b"TCB\0");
    bytes.push(0x40);
    bytes.push(0);
    bytes.extend_from_slice(b"APP1");
    bytes.extend_from_slice(b"CTX1");
    bytes.extend_from_slice(&body);
    bytes
}

#[test]
fn test_decode_file_with_loaded_descriptions() {
    let _ = env_logger::builder().is_test(true).try_init();

    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "tcb.xml", &tcb_fibex());

    let mut trace = non_verbose_packet(10, &23u32.to_le_bytes());
    trace.extend(non_verbose_packet(99, &[1, 2]));
    let trace_path = dir.path().join("trace.dlt");
    fs::write(&trace_path, &trace).unwrap();

    let config = DecoderConfig::new().add_fibex_path(dir.path());
    let mut decoder = Decoder::from_config(config).unwrap();
    assert!(decoder.frame_map().is_some());

    let lines: Vec<_> = decoder
        .decode_file(&trace_path)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(lines.len(), 2);

    assert_eq!(lines[0].text(), "Temperature: 23");
    assert_eq!(lines[0].message_id, Some(10));
    assert_eq!(lines[0].dlt_type, DltType::LogInfo);

    assert_eq!(
        lines[1].arguments,
        vec![Argument::NonVerbose {
            message_id: 99,
            bytes: vec![1, 2]
        }]
    );
    assert_eq!(lines[1].line, 1);
}
