//! End-to-end scenarios: graph json in, kernel source text out.

use serde_json::json;
use texture_forge::processor::GraphProcessor;
use texture_forge::{Graph, RecordingDispatch};

fn graph(v: serde_json::Value) -> Graph {
    serde_json::from_value(v).unwrap()
}

fn noise_chain_graph() -> Graph {
    graph(json!({
        "version": "1.0",
        "metadata": { "name": "noise-chain" },
        "nodes": [
            { "id": "noise", "type": "NoiseGenerator",
              "params": { "mode": "value", "scale": 4.0 } },
            { "id": "bright", "type": "Brightness", "params": { "amount": 1.5 } },
            { "id": "shuffle", "type": "Shuffle",
              "params": { "r": "b", "g": "g", "b": "r", "a": "a" } },
            { "id": "out", "type": "WriteTexture2D",
              "params": { "width": 256, "height": 128 } }
        ],
        "connections": [
            { "id": "c1", "from": { "nodeId": "noise", "portId": "output" },
              "to": { "nodeId": "bright", "portId": "color" } },
            { "id": "c2", "from": { "nodeId": "bright", "portId": "output" },
              "to": { "nodeId": "shuffle", "portId": "input" } },
            { "id": "c3", "from": { "nodeId": "shuffle", "portId": "output" },
              "to": { "nodeId": "out", "portId": "color" } }
        ]
    }))
}

#[test]
fn noise_chain_emits_a_complete_kernel() {
    let mut p = GraphProcessor::new(noise_chain_graph()).unwrap();
    p.build_graph().unwrap();
    let src = p.generate_code_only().unwrap();

    assert!(src.starts_with("// Auto-generated shader code\n"));
    assert!(src.contains("#pragma kernel CSMain0"));
    assert!(!src.contains("#pragma kernel CSMain1"));
    assert!(src.contains("float4 textureSize; // width, height, 1/width, 1/height"));
    assert!(src.contains("RWTexture2D<float4> outputTex_0;"));
    assert!(src.contains("float hash21(float2 p)"));
    assert!(src.contains("float value_noise(float2 p)"));
    assert!(src.contains("[numthreads(8,8,1)]"));
    assert!(src.contains("uint2 pixelCoordinate = dispatchThreadID.xy;"));
    assert!(src.contains("float2 uv = (pixelCoordinate + 0.5f) * textureSize.zw;"));
    assert!(src.contains("outputTex_0[pixelCoordinate] ="));

    // The shuffle's swizzle feeds the store: emitted before it.
    let swizzle_pos = src.find(".bgra").unwrap();
    let store_pos = src.find("outputTex_0[pixelCoordinate]").unwrap();
    assert!(swizzle_pos < store_pos);
}

#[test]
fn two_sinks_get_independent_kernels_with_their_own_noise_copies() {
    let mut p = GraphProcessor::new(graph(json!({
        "version": "1.0",
        "metadata": { "name": "two-sinks" },
        "nodes": [
            { "id": "noise", "type": "NoiseGenerator", "params": { "mode": "value" } },
            { "id": "outA", "type": "WriteTexture2D", "params": { "width": 64, "height": 64 } },
            { "id": "outB", "type": "WriteTexture2D", "params": { "width": 32, "height": 32 } }
        ],
        "connections": [
            { "id": "c1", "from": { "nodeId": "noise", "portId": "output" },
              "to": { "nodeId": "outA", "portId": "color" } },
            { "id": "c2", "from": { "nodeId": "noise", "portId": "output" },
              "to": { "nodeId": "outB", "portId": "color" } }
        ]
    })))
    .unwrap();
    p.build_graph().unwrap();
    let src = p.generate_code_only().unwrap();

    assert!(src.contains("#pragma kernel CSMain0"));
    assert!(src.contains("#pragma kernel CSMain1"));
    assert!(src.contains("void CSMain0 "));
    assert!(src.contains("void CSMain1 "));
    // Each kernel materializes its own noise sample; no cross-kernel
    // sharing. One occurrence is the library function signature itself.
    assert_eq!(src.matches("value_noise(").count(), 3);
}

#[test]
fn recompiling_an_unchanged_graph_is_byte_identical() {
    let mut a = GraphProcessor::new(noise_chain_graph()).unwrap();
    a.build_graph().unwrap();
    let first = a.generate_code_only().unwrap();
    let second = a.generate_code_only().unwrap();
    assert_eq!(first, second);

    let mut b = GraphProcessor::new(noise_chain_graph()).unwrap();
    b.build_graph().unwrap();
    assert_eq!(first, b.generate_code_only().unwrap());
}

#[test]
fn builtin_data_node_compiles_down_to_the_dispatch_builtin() {
    let mut p = GraphProcessor::new(graph(json!({
        "version": "1.0",
        "metadata": { "name": "builtin" },
        "nodes": [
            { "id": "bi", "type": "BuiltInData", "params": { "data": "uv" } },
            { "id": "out", "type": "WriteTexture2D", "params": {} }
        ],
        "connections": [
            { "id": "c1", "from": { "nodeId": "bi", "portId": "output" },
              "to": { "nodeId": "out", "portId": "color" } }
        ]
    })))
    .unwrap();
    p.build_graph().unwrap();
    let src = p.generate_code_only().unwrap();

    // The alias declaration inlines away: the store reads `uv` directly.
    assert!(src.contains("outputTex_0[pixelCoordinate] = uv;"), "source was:\n{src}");
}

#[test]
fn cycle_fails_the_build() {
    let mut p = GraphProcessor::new(graph(json!({
        "version": "1.0",
        "metadata": { "name": "cyclic" },
        "nodes": [
            { "id": "a", "type": "Brightness", "params": {} },
            { "id": "b", "type": "Contrast", "params": {} },
            { "id": "out", "type": "WriteTexture2D", "params": {} }
        ],
        "connections": [
            { "id": "c1", "from": { "nodeId": "a", "portId": "output" },
              "to": { "nodeId": "b", "portId": "color" } },
            { "id": "c2", "from": { "nodeId": "b", "portId": "output" },
              "to": { "nodeId": "a", "portId": "color" } },
            { "id": "c3", "from": { "nodeId": "b", "portId": "output" },
              "to": { "nodeId": "out", "portId": "color" } }
        ]
    })))
    .unwrap();
    assert!(p.build_graph().is_err());
}

#[test]
fn execute_records_load_bind_and_tiled_dispatch() {
    let mut p = GraphProcessor::new(noise_chain_graph()).unwrap();
    p.build_graph().unwrap();

    let mut dispatch = RecordingDispatch::new();
    let report = p.execute_graph(&mut dispatch).unwrap();
    assert_eq!(report.succeeded, ["out"]);
    assert!(report.failed.is_empty());
    assert!(dispatch.kernel_source.is_some());

    // 256x128 target at 8x8 tiles.
    assert!(dispatch.calls.iter().any(|c| c == "dispatch k0 32x16x1"));
    assert!(dispatch.calls.iter().any(|c| c.starts_with("create_texture t0 256x128")));
    assert!(dispatch
        .calls
        .iter()
        .any(|c| c.starts_with("set_vector k0 textureSize")));
    // No export path: the target is still released at cleanup.
    assert!(dispatch.calls.iter().any(|c| c == "release_texture t0"));
}

#[test]
fn a_failing_sink_does_not_abort_its_sibling() {
    let mut p = GraphProcessor::new(graph(json!({
        "version": "1.0",
        "metadata": { "name": "partial" },
        "nodes": [
            { "id": "bad", "type": "Add", "params": { "dimension": 9 } },
            { "id": "outA", "type": "WriteTexture2D", "params": {} },
            { "id": "noise", "type": "NoiseGenerator", "params": { "mode": "value" } },
            { "id": "outB", "type": "WriteTexture2D", "params": {} }
        ],
        "connections": [
            { "id": "c1", "from": { "nodeId": "bad", "portId": "output" },
              "to": { "nodeId": "outA", "portId": "color" } },
            { "id": "c2", "from": { "nodeId": "noise", "portId": "output" },
              "to": { "nodeId": "outB", "portId": "color" } }
        ]
    })))
    .unwrap();
    p.build_graph().unwrap();

    let mut dispatch = RecordingDispatch::new();
    let report = p.execute_graph(&mut dispatch).unwrap();
    assert_eq!(report.succeeded, ["outB"]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "outA");
}

#[test]
fn constants_are_inlined_without_arithmetic_folding() {
    // FloatInput 5.0 feeds Add.a, inline param 3.0 feeds Add.b: both sides
    // materialize as constants that inline into the sum unfolded.
    let mut p = GraphProcessor::new(graph(json!({
        "version": "1.0",
        "metadata": { "name": "inline" },
        "nodes": [
            { "id": "five", "type": "FloatInput", "params": { "value": 5.0 } },
            { "id": "sum", "type": "Add", "params": { "b": 3.0 } },
            { "id": "combine", "type": "Combine", "params": {} },
            { "id": "out", "type": "WriteTexture2D", "params": {} }
        ],
        "connections": [
            { "id": "c1", "from": { "nodeId": "five", "portId": "value" },
              "to": { "nodeId": "sum", "portId": "a" } },
            { "id": "c2", "from": { "nodeId": "sum", "portId": "output" },
              "to": { "nodeId": "combine", "portId": "r" } },
            { "id": "c3", "from": { "nodeId": "combine", "portId": "output" },
              "to": { "nodeId": "out", "portId": "color" } }
        ]
    })))
    .unwrap();
    p.build_graph().unwrap();
    let src = p.generate_code_only().unwrap();

    assert!(src.contains("(5.0 + 3.0)"), "source was:\n{src}");
    assert!(!src.contains("= 8.0"));
    // The constant definitions themselves are dropped.
    assert!(!src.contains("float a_"));
}

#[test]
fn write_texture_exports_a_png_on_cleanup() {
    let dir = tempfile::tempdir().unwrap();
    let out_path = dir.path().join("result.png");

    let mut p = GraphProcessor::new(graph(json!({
        "version": "1.0",
        "metadata": { "name": "export" },
        "nodes": [
            { "id": "noise", "type": "NoiseGenerator", "params": { "mode": "value" } },
            { "id": "out", "type": "WriteTexture2D",
              "params": { "width": 16, "height": 16, "path": out_path.to_str().unwrap() } }
        ],
        "connections": [
            { "id": "c1", "from": { "nodeId": "noise", "portId": "output" },
              "to": { "nodeId": "out", "portId": "color" } }
        ]
    })))
    .unwrap();
    p.build_graph().unwrap();

    let mut dispatch = RecordingDispatch::new();
    let report = p.execute_graph(&mut dispatch).unwrap();
    assert!(report.failed.is_empty());
    assert!(out_path.is_file());

    let img = image::open(&out_path).unwrap().to_rgba8();
    assert_eq!(img.dimensions(), (16, 16));
}

#[test]
fn invalid_output_path_fails_before_compilation() {
    let mut p = GraphProcessor::new(graph(json!({
        "version": "1.0",
        "metadata": { "name": "badpath" },
        "nodes": [
            { "id": "out", "type": "WriteTexture2D",
              "params": { "path": "/definitely/not/a/dir/x.png" } }
        ],
        "connections": []
    })))
    .unwrap();
    p.build_graph().unwrap();

    let mut dispatch = RecordingDispatch::new();
    let err = p.execute_graph(&mut dispatch).unwrap_err();
    assert!(err.to_string().contains("invalid output path"));
    // Nothing was compiled or dispatched.
    assert!(dispatch.calls.is_empty());
}
