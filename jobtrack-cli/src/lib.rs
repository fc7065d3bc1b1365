//! # jobtrack-cli
//!
//! The `jobtrack` binary.
//!
//! | Command | Description |
//! |---------|-------------|
//! | `jobtrack add-user <name>` / `delete-user <id>` | Manage users |
//! | `jobtrack add-job <title> <company>` | Record an application; the description comes from a file or stdin |
//! | `jobtrack update-job <id>` / `delete-job <id>` | Change or drop an application |
//! | `jobtrack list-jobs` | Page through applications, with filters |
//! | `jobtrack add-resume` / `update-resume` | Résumé main info; updates create a revision |
//! | `jobtrack add-template` / `update-template` | LaTeX résumé templates; updates create a revision |
//! | `jobtrack render <resume> <template>` | Fill a template with a résumé |
//!
//! Every command reads `jobtrack.yaml` from the working directory (see
//! [`jobtrack_core::JobtrackConfig`]) and works on the configured database.

pub mod commands;
