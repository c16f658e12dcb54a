use assert_json_diff::assert_json_eq;
use gecko_profile::debugid::DebugId;
use gecko_profile::{Category, Frame, Lib, ProfileBuilder, ThreadBuilder};
use serde_json::json;

#[test]
fn two_threads_with_shared_prefixes() {
    let mut profile = ProfileBuilder::new("MyApp", 1.0);
    profile.add_lib(Lib {
        name: "MyApp".to_string(),
        path: "/Applications/MyApp.app/Contents/MacOS/MyApp".to_string(),
        debug_name: "MyApp".to_string(),
        debug_path: "/Applications/MyApp.app/Contents/MacOS/MyApp".to_string(),
        arch: Some("arm64".to_string()),
        debug_id: "2fd8b4c6-3c2a-3f21-9d41-6a3c20a4a7f1".parse::<DebugId>().unwrap(),
        code_id: None,
        start_address: 0x100000000,
        end_address: 0x180000000,
    });

    let mut worker = ThreadBuilder::new(7, "Worker");
    let work = worker.intern_frame(Frame::Name("work"), || Category::User);
    let start = worker.intern_frame(Frame::Name("thread_start"), || Category::Library);
    worker.add_sample(12.0, &[work, start]);
    worker.add_sample(13.0, &[]);

    let mut main = ThreadBuilder::new(1, "Main Thread");
    let draw = main.intern_frame(Frame::Name("draw"), || Category::Framework);
    let run = main.intern_frame(Frame::Name("main"), || Category::User);
    let unknown = main.intern_frame(Frame::Address(0x18000), || Category::Other);
    main.add_sample(10.0, &[draw, run]);
    main.add_sample(11.0, &[unknown, run]);
    main.add_sample(12.0, &[draw, run]);

    profile.add_thread(worker);
    profile.add_thread(main);

    assert_eq!(profile.start_time(), 10.0);

    assert_json_eq!(
        profile,
        json!({
            "meta": {
                "version": 24,
                "startTime": 10.0,
                "shutdownTime": null,
                "pausedRanges": [],
                "product": "MyApp",
                "interval": 1.0,
                "stackwalk": 1,
                "debug": false,
                "processType": 0,
                "categories": [
                    { "name": "User", "color": "yellow", "subcategories": ["Other"] },
                    { "name": "Framework", "color": "blue", "subcategories": ["Other"] },
                    { "name": "Library", "color": "purple", "subcategories": ["Other"] },
                    { "name": "Other", "color": "grey", "subcategories": ["Other"] },
                    { "name": "Virtual Memory", "color": "orange", "subcategories": ["Other"] }
                ],
                "markerSchema": []
            },
            "libs": [
                {
                    "name": "MyApp",
                    "path": "/Applications/MyApp.app/Contents/MacOS/MyApp",
                    "debugName": "MyApp",
                    "debugPath": "/Applications/MyApp.app/Contents/MacOS/MyApp",
                    "breakpadId": "2FD8B4C63C2A3F219D416A3C20A4A7F10",
                    "codeId": null,
                    "offset": 0,
                    "start": 4294967296u64,
                    "end": 6442450944u64,
                    "arch": "arm64"
                }
            ],
            "threads": [
                {
                    "name": "Main Thread",
                    "tid": 1,
                    "pid": 0,
                    "processType": "default",
                    "processName": "MyApp",
                    "registerTime": 0.0,
                    "unregisterTime": null,
                    "frameTable": {
                        "schema": {
                            "location": 0,
                            "relevantForJS": 1,
                            "innerWindowID": 2,
                            "implementation": 3,
                            "line": 4,
                            "column": 5,
                            "category": 6,
                            "subcategory": 7
                        },
                        "data": [
                            [0, false, 0, null, null, null, 1, 0],
                            [1, false, 0, null, null, null, 0, 0],
                            [2, false, 0, null, null, null, 3, 0]
                        ]
                    },
                    "stackTable": {
                        "schema": { "prefix": 0, "frame": 1, "category": 2 },
                        "data": [
                            [null, 1, 0],
                            [0, 0, 1],
                            [0, 2, 3]
                        ]
                    },
                    "samples": {
                        "schema": { "stack": 0, "time": 1, "eventDelay": 2 },
                        "data": [
                            [1, 10.0, 0.0],
                            [2, 11.0, 0.0],
                            [1, 12.0, 0.0]
                        ]
                    },
                    "markers": {
                        "schema": {
                            "name": 0,
                            "startTime": 1,
                            "endTime": 2,
                            "phase": 3,
                            "category": 4,
                            "data": 5
                        },
                        "data": []
                    },
                    "stringTable": ["draw", "main", "0x18000"]
                },
                {
                    "name": "Worker",
                    "tid": 7,
                    "pid": 0,
                    "processType": "default",
                    "processName": "MyApp",
                    "registerTime": 0.0,
                    "unregisterTime": null,
                    "frameTable": {
                        "schema": {
                            "location": 0,
                            "relevantForJS": 1,
                            "innerWindowID": 2,
                            "implementation": 3,
                            "line": 4,
                            "column": 5,
                            "category": 6,
                            "subcategory": 7
                        },
                        "data": [
                            [0, false, 0, null, null, null, 0, 0],
                            [1, false, 0, null, null, null, 2, 0]
                        ]
                    },
                    "stackTable": {
                        "schema": { "prefix": 0, "frame": 1, "category": 2 },
                        "data": [
                            [null, 1, 2],
                            [0, 0, 0]
                        ]
                    },
                    "samples": {
                        "schema": { "stack": 0, "time": 1, "eventDelay": 2 },
                        "data": [
                            [1, 12.0, 0.0],
                            [null, 13.0, 0.0]
                        ]
                    },
                    "markers": {
                        "schema": {
                            "name": 0,
                            "startTime": 1,
                            "endTime": 2,
                            "phase": 3,
                            "category": 4,
                            "data": 5
                        },
                        "data": []
                    },
                    "stringTable": ["work", "thread_start"]
                }
            ],
            "processes": []
        })
    );
}

#[test]
fn identical_input_gives_identical_tables() {
    fn build() -> serde_json::Value {
        let mut profile = ProfileBuilder::new("App", 5.0);
        let mut thread = ThreadBuilder::new(3, "T");
        for i in 0..20u64 {
            let leaf = thread.intern_frame(Frame::Address(0x1000 + (i % 3) * 4), || Category::Other);
            let root = thread.intern_frame(Frame::Name("root"), || Category::User);
            thread.add_sample(i as f64, &[leaf, root]);
        }
        profile.add_thread(thread);
        profile.to_json()
    }

    let first = build();
    let second = build();
    assert_eq!(first, second);
    let thread = &first["threads"][0];
    assert_eq!(thread["stringTable"].as_array().unwrap().len(), 4);
    assert_eq!(thread["frameTable"]["data"].as_array().unwrap().len(), 4);
    // root plus three distinct leaves
    assert_eq!(thread["stackTable"]["data"].as_array().unwrap().len(), 4);
    assert_eq!(thread["samples"]["data"].as_array().unwrap().len(), 20);
}
