/*!
Command dispatcher module: declarations and re-exports only.

Layout:
  src/cmd/
    mod.rs          (this file)
    subject.rs      (Subject enum + helpers)
    list.rs         (ListArgs   + execute_list)
    get.rs          (GetArgs    + execute_get)
    search.rs       (SearchArgs + execute_search)
    exec.rs         (ExecArgs   + execute_exec)
    shared.rs       (JSON views, table rows, error reporting)
    format.rs       (header / table / colour helpers)

Conventions:
  - Each subcommand module exposes one public `execute_*` function taking
    the loaded `AppContext` and returning `anyhow::Result<()>`.
  - Failures already printed to the user come back as `shared::Reported`
    so `main` only sets the exit status.
  - Argument structs derive `clap::Args` and are kept minimal.
*/

pub mod exec;
pub mod format;
pub mod get;
pub mod list;
pub mod search;
pub mod shared;
pub mod subject;

pub use exec::{ExecArgs, execute_exec};
pub use get::{GetArgs, execute_get};
pub use list::{ListArgs, execute_list};
pub use search::{SearchArgs, execute_search};
pub use shared::Reported;
