// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

/// Diagnostic logging setup for the CLI.
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "gha_report=info";
const VERBOSE_FILTER: &str = "gha_report=debug,info";

/// Filter directives used when `RUST_LOG` is unset.
pub fn default_filter(verbose: bool,) -> &'static str
{
    if verbose { VERBOSE_FILTER } else { DEFAULT_FILTER }
}

/// Installs a compact stderr subscriber. `RUST_LOG` overrides the default
/// filter. Calling this twice leaves the first subscriber in place.
pub fn init_logging(verbose: bool,)
{
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose,),),);

    let _ = tracing_subscriber::registry()
        .with(filter,)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr,)
                .with_target(false,)
                .with_thread_ids(false,)
                .with_file(false,)
                .with_line_number(false,)
                .compact(),
        )
        .try_init();
}
