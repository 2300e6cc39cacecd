//! Core-pinned FreeRTOS tasks for the controller's threads.
//!
//! On ESP-IDF `std::thread` is a pthread over a FreeRTOS task.
//! `esp_pthread_set_cfg()` stores a per-thread config consumed by the
//! *next* `pthread_create()` from the same thread, so configuring and
//! spawning happen back to back inside [`TaskSpec::spawn`].  Host builds
//! spawn a plain named thread.

use crate::error::{Error, Result};
use log::{error, info};

/// CPU core identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Core {
    /// PRO_CPU, left to the network stacks.
    Pro = 0,
    /// APP_CPU.
    App = 1,
}

/// Placement and sizing of one long-running task.
#[derive(Debug, Clone, Copy)]
pub struct TaskSpec {
    /// NUL-terminated, it is handed to FreeRTOS as a C string.
    pub name: &'static str,
    pub core: Core,
    pub priority: u8,
    pub stack_kb: usize,
}

/// Sensor polling, arbitration and telemetry.
pub const CONTROL_TASK: TaskSpec = TaskSpec {
    name: "watering\0",
    core: Core::App,
    priority: 5,
    stack_kb: 8,
};

/// Relay writer; one priority above the control loop so a stop request
/// is never starved by a slow sensor cycle.
pub const RELAY_TASK: TaskSpec = TaskSpec {
    name: "pump-relay\0",
    core: Core::App,
    priority: 6,
    stack_kb: 4,
};

/// Status LED blinker; below the control loop, a late flash is harmless.
pub const LED_TASK: TaskSpec = TaskSpec {
    name: "status-led\0",
    core: Core::App,
    priority: 4,
    stack_kb: 3,
};

impl TaskSpec {
    fn label(&self) -> &'static str {
        self.name.trim_end_matches('\0')
    }

    /// Start `f` on its own task.  Failure is reported as [`Error::Init`].
    pub fn spawn(self, f: impl FnOnce() + Send + 'static) -> Result<std::thread::JoinHandle<()>> {
        self.configure()?;
        info!(
            "Task '{}' on {:?} (pri={}, stack={}KB)",
            self.label(),
            self.core,
            self.priority,
            self.stack_kb
        );

        let builder = std::thread::Builder::new().name(self.label().into());
        // ESP-IDF takes the stack size from the pthread config.
        #[cfg(not(target_os = "espidf"))]
        let builder = builder.stack_size(self.stack_kb * 1024);

        builder.spawn(f).map_err(|e| {
            error!("Task '{}' creation failed: {}", self.label(), e);
            Error::Init("task creation")
        })
    }

    #[cfg(target_os = "espidf")]
    fn configure(&self) -> Result<()> {
        use esp_idf_sys::{ESP_OK, esp_create_default_pthread_config, esp_pthread_set_cfg};

        // SAFETY: the default config is fully initialised by IDF and
        // `name` is a 'static NUL-terminated string.
        let ret = unsafe {
            let mut cfg = esp_create_default_pthread_config();
            cfg.pin_to_core = self.core as i32;
            cfg.prio = i32::from(self.priority);
            cfg.stack_size = (self.stack_kb * 1024) as i32;
            cfg.thread_name = self.name.as_ptr().cast();
            esp_pthread_set_cfg(&cfg)
        };
        if ret != ESP_OK as i32 {
            error!("esp_pthread_set_cfg({}) failed: {}", self.label(), ret);
            return Err(Error::Init("pthread config"));
        }
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    #[allow(clippy::unnecessary_wraps)]
    fn configure(&self) -> Result<()> {
        Ok(())
    }
}
