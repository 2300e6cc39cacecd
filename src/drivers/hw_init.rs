//! One-shot hardware peripheral initialisation.
//!
//! Configures the ADC1 oneshot unit for the soil probe and installs the
//! level switch interrupt, using raw ESP-IDF sys calls.  Digital pins are
//! owned by `esp-idf-hal` drivers created in `main`; this module only adds
//! what those drivers do not cover.  Called once from `main()` before the
//! control loop starts.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

use crate::events::ControlSignals;
#[cfg(target_os = "espidf")]
use crate::pins;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    AdcInitFailed(i32),
    IsrInstallFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::AdcInitFailed(rc) => write!(f, "ADC1 init failed (rc={})", rc),
            Self::IsrInstallFailed(rc) => write!(f, "level ISR install failed (rc={})", rc),
        }
    }
}

impl From<HwInitError> for crate::Error {
    fn from(e: HwInitError) -> Self {
        match e {
            HwInitError::AdcInitFailed(_) => Self::Init("ADC1"),
            HwInitError::IsrInstallFailed(_) => Self::Init("level ISR"),
        }
    }
}

/// Soil moisture probe (GPIO 36).
pub const ADC1_CH_SOIL_MOISTURE: u32 = 0;
/// Soil NTC divider (GPIO 39).
pub const ADC1_CH_SOIL_TEMP: u32 = 3;

// ── ADC (oneshot) ─────────────────────────────────────────────

#[cfg(target_os = "espidf")]
static mut ADC1_HANDLE: adc_oneshot_unit_handle_t = core::ptr::null_mut();

#[cfg(target_os = "espidf")]
fn esp_check(ret: esp_err_t) -> Result<(), esp_err_t> {
    if ret == ESP_OK as esp_err_t {
        Ok(())
    } else {
        Err(ret)
    }
}

/// Create the ADC1 oneshot unit and configure both soil channels.
#[cfg(target_os = "espidf")]
pub fn init_adc() -> Result<(), HwInitError> {
    let init_cfg = adc_oneshot_unit_init_cfg_t {
        unit_id: adc_unit_t_ADC_UNIT_1,
        ulp_mode: adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
        ..Default::default()
    };
    // SAFETY: ADC1_HANDLE is written only here, once at boot, before the
    // control loop (its only reader) is spawned.
    esp_check(unsafe { adc_oneshot_new_unit(&init_cfg, &raw mut ADC1_HANDLE) })
        .map_err(HwInitError::AdcInitFailed)?;

    let chan_cfg = adc_oneshot_chan_cfg_t {
        atten: adc_atten_t_ADC_ATTEN_DB_12,
        bitwidth: adc_bitwidth_t_ADC_BITWIDTH_12,
    };
    for channel in [ADC1_CH_SOIL_MOISTURE, ADC1_CH_SOIL_TEMP] {
        // SAFETY: handle initialised above.
        esp_check(unsafe { adc_oneshot_config_channel(ADC1_HANDLE, channel, &chan_cfg) })
            .map_err(HwInitError::AdcInitFailed)?;
    }

    info!("hw_init: ADC1 configured (CH0=moisture, CH3=soil temp)");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_adc() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): ADC init skipped");
    Ok(())
}

/// Read one ADC1 channel.  Returns 0 on failure, which the soil
/// conversions treat as an invalid reading.
#[cfg(target_os = "espidf")]
pub fn adc1_read(channel: u32) -> u16 {
    let mut raw: i32 = 0;
    // SAFETY: ADC1_HANDLE was set by init_adc() before the control loop
    // started; the control loop is the only caller.
    let ret = unsafe { adc_oneshot_read(ADC1_HANDLE, channel, &mut raw) };
    if ret != ESP_OK as esp_err_t {
        return 0;
    }
    raw.max(0) as u16
}

// ── Level switch ISR ──────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe extern "C" fn level_isr(arg: *mut core::ffi::c_void) {
    // SAFETY: `arg` is the `&'static ControlSignals` registered in
    // init_level_isr(); gpio_get_level is a register read.
    let signals = unsafe { &*(arg as *const ControlSignals) };
    let low = unsafe { gpio_get_level(pins::WATER_LEVEL_GPIO) } == 0;
    signals.level_edge(low);
}

/// Install the GPIO ISR service and route both edges of the level switch
/// to [`ControlSignals::level_edge`].  The current level is published
/// once so the loop starts from the real state.
///
/// The pin must already be configured as an input.
#[cfg(target_os = "espidf")]
pub fn init_level_isr(signals: &'static ControlSignals) -> Result<(), HwInitError> {
    // SAFETY: ESP_ERR_INVALID_STATE means the service is already installed,
    // which is fine.  The handler only touches atomics and the embassy
    // signal, both ISR-safe.  `signals` is 'static so the arg pointer
    // never dangles.
    unsafe {
        let ret = gpio_install_isr_service(0);
        if ret != ESP_OK as esp_err_t && ret != ESP_ERR_INVALID_STATE as esp_err_t {
            return Err(HwInitError::IsrInstallFailed(ret));
        }
        esp_check(gpio_set_intr_type(
            pins::WATER_LEVEL_GPIO,
            gpio_int_type_t_GPIO_INTR_ANYEDGE,
        ))
        .map_err(HwInitError::IsrInstallFailed)?;
        esp_check(gpio_isr_handler_add(
            pins::WATER_LEVEL_GPIO,
            Some(level_isr),
            core::ptr::from_ref(signals).cast_mut().cast(),
        ))
        .map_err(HwInitError::IsrInstallFailed)?;
        esp_check(gpio_intr_enable(pins::WATER_LEVEL_GPIO))
            .map_err(HwInitError::IsrInstallFailed)?;

        signals.level_edge(gpio_get_level(pins::WATER_LEVEL_GPIO) == 0);
    }
    info!("hw_init: level ISR installed (GPIO {})", pins::WATER_LEVEL_GPIO);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_level_isr(_signals: &'static ControlSignals) -> Result<(), HwInitError> {
    log::info!("hw_init(sim): level ISR skipped");
    Ok(())
}
