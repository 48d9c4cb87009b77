/// Assert that the given store path exists
///
/// ### Examples
/// ```
/// use aclmod::prelude::*;
///
/// let store = MemStore::new();
/// store.add_file("/file", 0o644).unwrap();
/// assert_store_exists!(&store, "/file");
/// ```
#[macro_export]
macro_rules! assert_store_exists {
    ($store:expr, $path:expr) => {
        if !$store.exists($path) {
            panic_msg!("assert_store_exists!", "doesn't exist", $path);
        }
    };
}

/// Assert that the given store path does not exist
///
/// ### Examples
/// ```
/// use aclmod::prelude::*;
///
/// let store = MemStore::new();
/// assert_store_no_exists!(&store, "/file");
/// ```
#[macro_export]
macro_rules! assert_store_no_exists {
    ($store:expr, $path:expr) => {
        if $store.exists($path) {
            panic_msg!("assert_store_no_exists!", "still exists", $path);
        }
    };
}

/// Assert the permission bits currently committed for the given store path
///
/// The directory flag is masked off so the target is always given as plain
/// permission bits regardless of the node type.
///
/// ### Examples
/// ```
/// use aclmod::prelude::*;
///
/// let store = MemStore::new();
/// store.add_file("/file", 0o644).unwrap();
/// assert_store_mode!(&store, "/file", 0o644);
/// ```
#[macro_export]
macro_rules! assert_store_mode {
    ($store:expr, $path:expr, $mode:expr) => {
        match $store.mode($path) {
            Ok(x) => {
                if x & !MODE_DIR != $mode {
                    panic_compare_msg!(
                        "assert_store_mode!",
                        "mode doesn't match the target",
                        format!("{:o}", x & !MODE_DIR),
                        format!("{:o}", $mode)
                    );
                }
            },
            Err(_) => panic_msg!("assert_store_mode!", "doesn't exist", $path),
        }
    };
}

/// Helper function for testing to simply panic with the given message in a repeatable formatting.
///
/// ### Examples
/// ```ignore,no_run
/// use aclmod::prelude::*;
///
/// panic_msg!("assert_store_exists!", "doesn't exist", PathBuf::from("foo"));
/// ```
#[macro_export]
macro_rules! panic_msg {
    ($name:expr, $msg:expr, $target:expr) => {
        panic!("\n{}: {}\n  target: {}\n", $name, $msg, format!("{:?}", $target))
    };
}

/// Helper function for testing to simply panic with the given message in a repeatable formatting.
///
/// ### Examples
/// ```ignore,no_run
/// use aclmod::prelude::*;
///
/// panic_compare_msg!("assert_store_mode!", "mode doesn't match the target", 0o600, 0o644);
/// ```
#[macro_export]
macro_rules! panic_compare_msg {
    ($name:expr, $msg:expr, $actual:expr, $target:expr) => {
        panic!(
            "\n{}: {}\n  actual: {}\n  target: {}\n",
            $name,
            $msg,
            format!("{:?}", $actual),
            format!("{:?}", $target)
        )
    };
}
