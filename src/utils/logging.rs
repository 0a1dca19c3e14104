use lazy_static::lazy_static;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::Level;
use tracing_subscriber::{prelude::*, EnvFilter};
use tracing_timing::{Builder, Histogram};

use parking_lot::RwLock;

// Categories for the operations the capacity search spends its time in
#[derive(Hash, Eq, PartialEq, Clone, Debug)]
pub enum OperationCategory {
    Search,
    OracleCall { subcategory: OracleCallType },
    ResultProcessing,
    FileIO { subcategory: FileIOType },
    Other,
}

#[derive(Hash, Eq, PartialEq, Clone, Debug)]
pub enum OracleCallType {
    PowerFlow,
    Contingency,
    ResultExport,
    InjectionManagement,
}

#[derive(Hash, Eq, PartialEq, Clone, Debug)]
pub enum FileIOType {
    DataLoad,
    ResultsSave,
}

impl OperationCategory {
    pub fn as_str(&self) -> String {
        match self {
            OperationCategory::Search => "Capacity Search".to_string(),
            OperationCategory::OracleCall { subcategory } => {
                format!(
                    "Oracle Call - {}",
                    match subcategory {
                        OracleCallType::PowerFlow => "Power Flow",
                        OracleCallType::Contingency => "Contingency Study",
                        OracleCallType::ResultExport => "Result Export",
                        OracleCallType::InjectionManagement => "Injection Management",
                    }
                )
            }
            OperationCategory::ResultProcessing => "Result Processing".to_string(),
            OperationCategory::FileIO { subcategory } => {
                format!(
                    "File I/O - {}",
                    match subcategory {
                        FileIOType::DataLoad => "Data Load",
                        FileIOType::ResultsSave => "Results Save",
                    }
                )
            }
            OperationCategory::Other => "Other Operations".to_string(),
        }
    }
}

lazy_static! {
    static ref TIMING_ENABLED: AtomicBool = AtomicBool::new(false);
    static ref FUNCTION_TIMINGS: Arc<RwLock<HashMap<String, (Duration, usize)>>> =
        Arc::new(RwLock::new(HashMap::new()));
    static ref CATEGORY_TIMINGS: Arc<RwLock<HashMap<OperationCategory, (Duration, usize)>>> =
        Arc::new(RwLock::new(HashMap::new()));
}

pub struct TimingGuard {
    function_name: String,
    category: OperationCategory,
    start: Instant,
}

impl Drop for TimingGuard {
    fn drop(&mut self) {
        if !is_timing_enabled() {
            return;
        }
        let duration = self.start.elapsed();
        {
            let mut timings = FUNCTION_TIMINGS.write();
            let entry = timings
                .entry(self.function_name.clone())
                .or_insert((Duration::from_nanos(0), 0));
            entry.0 += duration;
            entry.1 += 1;
        }
        {
            let mut timings = CATEGORY_TIMINGS.write();
            let entry = timings
                .entry(self.category.clone())
                .or_insert((Duration::from_nanos(0), 0));
            entry.0 += duration;
            entry.1 += 1;
        }
    }
}

pub fn start_timing(function_name: &str, category: OperationCategory) -> TimingGuard {
    TimingGuard {
        function_name: function_name.to_string(),
        category,
        start: Instant::now(),
    }
}

pub fn init_logging(enable_timing: bool, debug_logging: bool) {
    TIMING_ENABLED.store(enable_timing, Ordering::SeqCst);

    let base_level = if debug_logging { Level::DEBUG } else { Level::INFO };
    let env_filter = EnvFilter::from_default_env()
        .add_directive(base_level.into())
        .add_directive("hostcap=debug".parse().unwrap());

    if enable_timing {
        let histogram = || Histogram::<u64>::new_with_bounds(1, 60_000_000_000, 3).unwrap();
        let timing_layer = Builder::default().layer(histogram);

        let subscriber = tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .with(timing_layer.boxed());

        tracing::subscriber::set_global_default(subscriber)
            .expect("Failed to set up tracing subscriber");
    } else {
        let subscriber = tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().pretty());

        tracing::subscriber::set_global_default(subscriber)
            .expect("Failed to set up tracing subscriber");
    }
}

pub fn is_timing_enabled() -> bool {
    TIMING_ENABLED.load(Ordering::SeqCst)
}

pub fn print_timing_report() {
    if !is_timing_enabled() {
        return;
    }

    println!("\nDetailed Performance Report");
    println!("==========================");

    println!("\nTiming by Function:");
    println!("-------------------");
    let timings = FUNCTION_TIMINGS.read();
    let mut entries: Vec<_> = timings.iter().collect();
    entries.sort_by(|a, b| b.1 .0.cmp(&a.1 .0));
    for (function_name, (total, count)) in entries {
        let avg = total.div_f64((*count).max(1) as f64);
        println!(
            "{}: total={:.2}s, count={}, avg={:.2}ms",
            function_name,
            total.as_secs_f64(),
            count,
            avg.as_secs_f64() * 1000.0,
        );
    }

    println!("\nTiming by Category:");
    println!("-------------------");
    let category_timings = CATEGORY_TIMINGS.read();
    let total_time: f64 = category_timings.values().map(|(d, _)| d.as_secs_f64()).sum();
    let mut category_vec: Vec<_> = category_timings.iter().collect();
    category_vec.sort_by(|a, b| b.1 .0.cmp(&a.1 .0));
    for (category, (total, count)) in category_vec {
        let percentage = if total_time > 0.0 {
            total.as_secs_f64() / total_time * 100.0
        } else {
            0.0
        };
        println!(
            "{}: {:.1}% of total time, count={}, total={:.2}s",
            category.as_str(),
            percentage,
            count,
            total.as_secs_f64(),
        );
    }
    println!("==========================\n");
}
