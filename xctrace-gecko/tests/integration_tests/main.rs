use std::path::PathBuf;
use std::sync::Mutex;

use assert_json_diff::{assert_json_eq, assert_json_include};
use serde_json::json;
use xctrace_gecko::{
    convert, convert_run, probe_settings, save_profile_to_file, ConversionProps, Error,
    ExportDirectory, IdleGapMode, Library, Symbolicator, TraceSource,
};

fn fixture_dir(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn convert_fixture(props: &ConversionProps) -> serde_json::Value {
    let source = ExportDirectory::new(fixture_dir("basic"));
    convert(&source, props).unwrap().to_json()
}

#[test]
fn converts_an_exported_run() {
    let profile = convert_fixture(&ConversionProps::default());

    assert_json_include!(
        actual: &profile["meta"],
        expected: json!({
            "version": 24,
            "startTime": 10.0,
            "product": "MyApp",
            "interval": 1.0,
            "processType": 0,
            "pausedRanges": []
        })
    );
    assert_json_include!(
        actual: &profile["libs"],
        expected: json!([
            {
                "name": "MyApp",
                "path": "/Applications/MyApp.app/Contents/MacOS/MyApp",
                "breakpadId": "2FD8B4C63C2A3F219D416A3C20A4A7F10",
                "arch": "arm64",
                "start": 0x100000000u64,
                "end": 0x180000000u64
            },
            {
                "name": "AppKit",
                "path": "/System/Library/Frameworks/AppKit.framework/Versions/C/AppKit",
                "start": 0x180000000u64,
                "end": 0x190000000u64
            },
            {
                "name": "dyld",
                "path": "/usr/lib/dyld",
                "start": 0x190000000u64,
                "end": u64::MAX
            }
        ])
    );

    let threads = profile["threads"].as_array().unwrap();
    // The thread of the other process is filtered out.
    assert_eq!(threads.len(), 2);

    let main = &threads[0];
    assert_eq!(main["name"], "Main Thread");
    assert_eq!(main["tid"], 1);
    assert_eq!(main["pid"], 0);
    assert_eq!(main["processName"], "MyApp");
    assert_json_eq!(
        main["stringTable"],
        json!([
            "compute",
            "-[NSApplication run]",
            "start",
            "BSC_write",
            "write",
            "0x100002000"
        ])
    );
    assert_json_eq!(
        main["frameTable"]["data"],
        json!([
            [0, false, 0, null, null, null, 0, 0],
            [1, false, 0, null, null, null, 1, 0],
            [2, false, 0, null, null, null, 2, 0],
            [3, false, 0, null, null, null, 3, 0],
            [4, false, 0, null, null, null, 2, 0],
            [5, false, 0, null, null, null, 0, 0]
        ])
    );
    assert_json_eq!(
        main["stackTable"]["data"],
        json!([
            [null, 2, 2],
            [0, 1, 1],
            [1, 0, 0],
            [0, 4, 2],
            [3, 3, 3],
            [1, 5, 0]
        ])
    );
    // The syscall sorts between the CPU samples, and the gap after the sample
    // at 12ms is marked as idle at the end of that sample.
    assert_json_eq!(
        main["samples"]["data"],
        json!([
            [2, 10.0, 0.0],
            [2, 11.0, 0.0],
            [4, 11.5, 0.0],
            [5, 12.0, 0.0],
            [null, 13.0, 0.0],
            [2, 30.0, 0.0]
        ])
    );

    let worker = &threads[1];
    assert_eq!(worker["name"], "Worker");
    assert_eq!(worker["tid"], 2);
    assert_json_eq!(
        worker["stringTable"],
        json!(["work", "start", "VM: Zero Fill"])
    );
    assert_json_eq!(
        worker["frameTable"]["data"],
        json!([
            [0, false, 0, null, null, null, 0, 0],
            [1, false, 0, null, null, null, 2, 0],
            [2, false, 0, null, null, null, 4, 0]
        ])
    );
    assert_json_eq!(
        worker["stackTable"]["data"],
        json!([[null, 1, 2], [0, 0, 0], [null, 0, 0], [2, 2, 4]])
    );
    assert_json_eq!(
        worker["samples"]["data"],
        json!([[1, 10.5, 0.0], [3, 12.5, 0.0]])
    );
}

#[test]
fn conversion_is_deterministic() {
    let props = ConversionProps::default();
    assert_eq!(convert_fixture(&props), convert_fixture(&props));
}

#[test]
fn idle_gaps_can_be_disabled() {
    let profile = convert_fixture(&ConversionProps {
        idle_gap_mode: IdleGapMode::Disabled,
        ..Default::default()
    });
    let samples = profile["threads"][0]["samples"]["data"].as_array().unwrap();
    assert_eq!(samples.len(), 5);
    assert!(samples.iter().all(|sample| !sample[0].is_null()));
}

#[test]
fn app_name_controls_the_user_category() {
    let profile = convert_fixture(&ConversionProps {
        app_name: Some("AppKit".to_string()),
        ..Default::default()
    });
    assert_eq!(profile["meta"]["product"], "AppKit");
    let frames = &profile["threads"][0]["frameTable"]["data"];
    // compute is in MyApp, which is now just another image.
    assert_eq!(frames[0][6], 3);
    // -[NSApplication run] matches the app name before the framework prefix.
    assert_eq!(frames[1][6], 0);
}

#[test]
fn missing_run_is_reported() {
    let source = ExportDirectory::new(fixture_dir("basic"));
    let props = ConversionProps {
        run: 4,
        ..Default::default()
    };
    assert!(matches!(
        convert(&source, &props),
        Err(Error::RunNotFound(4))
    ));
}

/// Serves documents from memory; tables that aren't listed are missing.
struct InMemorySource {
    toc: String,
    tables: Vec<(&'static str, String)>,
}

impl TraceSource for InMemorySource {
    fn toc(&self) -> Result<String, Error> {
        Ok(self.toc.clone())
    }

    fn table(&self, _run: u32, schema: &str) -> Result<String, Error> {
        self.tables
            .iter()
            .find(|(name, _)| *name == schema)
            .map(|(_, text)| text.clone())
            .ok_or_else(|| Error::MissingTable(schema.to_string()))
    }
}

const TOC_WITH_THREAD_STATE: &str = r#"<trace-toc><run number="1"><info><target>
<device platform="iOS" name="Phone" os-version="17.0.3 (21A360)"/>
<process name="MyApp" pid="7"/>
</target></info><data>
<table schema="time-profile"/>
<table schema="thread-state"/>
</data></run></trace-toc>"#;

const TIME_PROFILE: &str = r#"<trace-query-result><node>
<schema name="time-profile">
  <col><mnemonic>time</mnemonic></col>
  <col><mnemonic>thread</mnemonic></col>
  <col><mnemonic>weight</mnemonic></col>
  <col><mnemonic>stack</mnemonic></col>
</schema>
<row>
  <sample-time id="1">0</sample-time>
  <thread id="2" fmt="Main Thread 0x5"><tid id="3">5</tid></thread>
  <weight id="4">1000000</weight>
  <backtrace id="5">
    <frame id="6" addr="0x1000080">
      <binary id="7" name="MyApp" UUID="2FD8B4C6-3C2A-3F21-9D41-6A3C20A4A7F1" load-addr="0x1000000" path="/private/var/containers/Bundle/Application/1/MyApp.app/MyApp"/>
    </frame>
    <frame id="8" addr="0x2000040">
      <binary id="9" name="libobjc.A.dylib" load-addr="0x2000000" path="/usr/lib/libobjc.A.dylib"/>
    </frame>
  </backtrace>
</row>
<row>
  <sample-time id="10">100000000</sample-time>
  <thread ref="2"/>
  <weight ref="4"/>
  <backtrace ref="5"/>
</row>
</node></trace-query-result>"#;

const THREAD_STATE: &str = r#"<trace-query-result><node>
<schema name="thread-state">
  <col><mnemonic>start</mnemonic></col>
  <col><mnemonic>duration</mnemonic></col>
  <col><mnemonic>thread</mnemonic></col>
  <col><mnemonic>state</mnemonic></col>
</schema>
<row>
  <start-time id="1">1000000</start-time>
  <duration id="2">99000000</duration>
  <thread id="3" fmt="Main Thread 0x5"><tid id="4">5</tid></thread>
  <thread-state id="5" fmt="Blocked">Blocked</thread-state>
</row>
<row>
  <start-time id="6">0</start-time>
  <duration id="7">1000000</duration>
  <thread ref="3"/>
  <thread-state id="8" fmt="Running">Running</thread-state>
</row>
</node></trace-query-result>"#;

fn device_source() -> InMemorySource {
    InMemorySource {
        toc: TOC_WITH_THREAD_STATE.to_string(),
        tables: vec![
            ("time-profile", TIME_PROFILE.to_string()),
            ("thread-state", THREAD_STATE.to_string()),
        ],
    }
}

#[test]
fn thread_state_replaces_idle_synthesis() {
    let source = device_source();
    let profile = convert(&source, &ConversionProps::default())
        .unwrap()
        .to_json();
    let thread = &profile["threads"][0];
    assert_eq!(thread["name"], "Main Thread");
    assert_eq!(profile["meta"]["interval"], 5.0);
    // The blocked interval is the only empty sample; nothing is synthesized
    // for the 99ms gap between the CPU samples.
    assert_json_eq!(
        thread["samples"]["data"],
        json!([[1, 0.0, 0.0], [null, 1.0, 0.0], [1, 100.0, 0.0]])
    );
    assert_json_eq!(thread["stringTable"], json!(["0x1000080", "0x2000040"]));
    assert_json_eq!(
        thread["stackTable"]["data"],
        json!([[null, 1, 2], [0, 0, 0]])
    );
}

struct RecordingSymbolicator {
    requests: Mutex<Vec<(String, Vec<u64>)>>,
}

impl Symbolicator for RecordingSymbolicator {
    fn symbolicate(
        &self,
        library: &Library,
        addresses: &[u64],
    ) -> Result<Vec<Option<String>>, Error> {
        self.requests
            .lock()
            .unwrap()
            .push((library.name.clone(), addresses.to_vec()));
        Ok(addresses
            .iter()
            .map(|address| match library.name.as_str() {
                "MyApp" => Some(format!("app_{address:x}")),
                _ => None,
            })
            .collect())
    }
}

#[test]
fn unresolved_frames_are_symbolicated_per_library() {
    let source = device_source();
    let props = ConversionProps::default();
    let settings = probe_settings(&source, props.run).unwrap();
    assert!(settings.device.as_ref().unwrap().is_remote());

    let symbolicator = RecordingSymbolicator {
        requests: Mutex::new(Vec::new()),
    };
    let profile = convert_run(&source, &settings, &props, Some(&symbolicator))
        .unwrap()
        .to_json();

    let mut requests = symbolicator.requests.into_inner().unwrap();
    requests.sort();
    assert_eq!(
        requests,
        vec![
            ("MyApp".to_string(), vec![0x1000080]),
            ("libobjc.A.dylib".to_string(), vec![0x2000040]),
        ]
    );
    assert_json_eq!(
        profile["threads"][0]["stringTable"],
        json!(["app_1000080", "0x2000040"])
    );
}

#[test]
fn missing_cpu_table_is_an_error() {
    let source = InMemorySource {
        toc: TOC_WITH_THREAD_STATE.to_string(),
        tables: vec![("thread-state", THREAD_STATE.to_string())],
    };
    match convert(&source, &ConversionProps::default()) {
        Err(Error::MissingTable(schema)) => assert_eq!(schema, "time-profile"),
        other => panic!("unexpected result {:?}", other.map(|_| ())),
    }
}

const DANGLING_BACKTRACE: &str = r#"<trace-query-result><node>
<schema name="time-profile">
  <col><mnemonic>time</mnemonic></col>
  <col><mnemonic>thread</mnemonic></col>
  <col><mnemonic>weight</mnemonic></col>
  <col><mnemonic>stack</mnemonic></col>
</schema>
<row>
  <sample-time id="1">0</sample-time>
  <thread id="2" fmt="Main Thread 0x5"><tid id="3">5</tid></thread>
  <weight id="4">1000000</weight>
  <backtrace ref="99"/>
</row>
</node></trace-query-result>"#;

#[test]
fn dangling_reference_in_a_row_aborts_the_run() {
    let source = InMemorySource {
        toc: TOC_WITH_THREAD_STATE.to_string(),
        tables: vec![
            ("time-profile", DANGLING_BACKTRACE.to_string()),
            ("thread-state", THREAD_STATE.to_string()),
        ],
    };
    match convert(&source, &ConversionProps::default()) {
        Err(Error::ReferenceResolution { tag, id }) => {
            assert_eq!(tag, "backtrace");
            assert_eq!(id, 99);
        }
        other => panic!("unexpected result {:?}", other.map(|_| ())),
    }
}

#[test]
fn saves_a_gzipped_profile() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("profile.json.gz");
    let source = ExportDirectory::new(fixture_dir("basic"));
    let profile = convert(&source, &ConversionProps::default()).unwrap();
    save_profile_to_file(&profile, &output).unwrap();
    assert!(std::fs::metadata(&output).unwrap().len() > 0);
}
