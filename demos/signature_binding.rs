//! Runtime decoration example for callback-guard.
//!
//! Demonstrates:
//! - Describing a function's parameters with `Signature`
//! - Calling the decorated function by position and by name
//! - Defaults, surplus positional values and unknown keywords
//! - Binding errors reported before the body runs
//!
//! Run with: `cargo run --example signature_binding`

use callback_guard::{
    ensure_callback, Arguments, BoundArguments, Callback, Plain, Signature, Value,
};

fn on_done() -> Callback<String> {
    Callback::new(|status: String| println!("   on_done({status})"))
}

fn main() {
    println!("=== callback-guard: Signature Binding ===\n");

    // -------------------------------------------------------------------------
    // 1. Decorate
    // -------------------------------------------------------------------------
    println!("1. Decorating `upload(path, on_done, *chunks, retries=3, **options)`...");

    let signature = Signature::new("upload")
        .param("path")
        .param("on_done")
        .var_args("chunks")
        .kw_only_or("retries", 3u32)
        .var_kwargs("options");

    let upload = match ensure_callback("on_done", "aborted".to_string()).decorate(
        signature,
        Plain::new(|mut bound: BoundArguments| -> Result<usize, String> {
            let path: String = bound.take("path").map_err(|e| e.to_string())?;
            let retries: u32 = bound.take("retries").map_err(|e| e.to_string())?;
            let chunks = bound
                .get::<Vec<Value>>("chunks")
                .map_err(|e| e.to_string())?
                .len();
            let options = bound
                .get::<Vec<(String, Value)>>("options")
                .map_err(|e| e.to_string())?
                .iter()
                .map(|(name, _)| name.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            println!("   upload {path}: {chunks} chunks, {retries} retries, options [{options}]");

            if chunks == 0 {
                return Err("nothing to upload".to_string());
            }
            let on_done: Callback<String> = bound.take("on_done").map_err(|e| e.to_string())?;
            on_done.call(format!("{chunks} chunks sent"));
            Ok(chunks)
        }),
    ) {
        Ok(upload) => upload,
        Err(e) => {
            println!("   Error: {e}");
            return;
        }
    };
    println!("   Decorated: {:?}", upload.signature().function());

    // -------------------------------------------------------------------------
    // 2. Call by position
    // -------------------------------------------------------------------------
    println!("\n2. Calling with positional chunks...");

    let result = upload.call(
        Arguments::new()
            .arg("a.txt".to_string())
            .arg(on_done())
            .arg(vec![0u8; 16])
            .arg(vec![1u8; 16]),
    );
    println!("   Result: {result:?}");

    // -------------------------------------------------------------------------
    // 3. Call by name
    // -------------------------------------------------------------------------
    println!("\n3. Calling by name with options and no chunks...");

    let result = upload.call(
        Arguments::new()
            .kwarg("on_done", on_done())
            .kwarg("path", "b.txt".to_string())
            .kwarg("retries", 5u32)
            .kwarg("compress", true),
    );
    println!("   Result: {result:?}");

    // -------------------------------------------------------------------------
    // 4. Binding errors
    // -------------------------------------------------------------------------
    println!("\n4. Calling with `path` given twice...");

    let callback = on_done();
    let arguments = Arguments::new()
        .arg("c.txt".to_string())
        .arg(callback.clone())
        .kwarg("path", "d.txt".to_string());
    match upload.call(arguments) {
        Ok(_) => println!("   Unexpected success"),
        Err(e) => println!("   Error (expected, {:?}): {e}", e.kind()),
    }
    println!("   callback still pending: {}", callback.is_pending());

    // -------------------------------------------------------------------------
    // 5. Configuration errors
    // -------------------------------------------------------------------------
    println!("\n5. Decorating a function without the callback parameter...");

    let decorated = ensure_callback("n/a", ()).decorate(
        Signature::new("mymethod").param("callback"),
        Plain::new(|_| ()),
    );
    match decorated {
        Ok(_) => println!("   Unexpected success"),
        Err(e) => println!("   Error (expected, {:?}): {e}", e.kind()),
    }

    println!("\n=== Example Complete ===");
}
