//! WebAssembly bindings for the LC-3 emulator.
//!
//! The page owns the terminal widget and the animation-frame loop: it calls
//! [`WasmVm::run_frame`] on every frame while [`WasmVm::wants_frame`] is
//! true, forwards keys with [`WasmVm::push_key`], and writes whatever
//! [`WasmVm::take_output`] returns.

use wasm_bindgen::prelude::*;
use crate::console::{to_terminal_text, BufferedConsole};
use crate::image::ObjectImage;
use crate::vm::{FrameQueue, Vm, VmConfig};

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// WebAssembly-friendly machine wrapper.
#[wasm_bindgen]
pub struct WasmVm {
    vm: Vm<BufferedConsole, FrameQueue>,
}

#[wasm_bindgen]
impl WasmVm {
    /// Create a machine. A `quantum` of 0 selects the default.
    #[wasm_bindgen(constructor)]
    pub fn new(quantum: u32) -> Self {
        let config = VmConfig::with_quantum(quantum).unwrap_or_default();
        Self {
            vm: Vm::new(BufferedConsole::new(), FrameQueue::new(), config),
        }
    }

    /// Set the operating-system image loaded by `begin`.
    #[wasm_bindgen]
    pub fn set_os(&mut self, image: &[u8]) -> Result<(), JsError> {
        let os = ObjectImage::parse(image).map_err(|e| JsError::new(&e.to_string()))?;
        self.vm.set_os(os);
        Ok(())
    }

    /// Reset, load the OS (if set) and `program`, and start running.
    #[wasm_bindgen]
    pub fn begin(&mut self, program: &[u8]) -> Result<(), JsError> {
        let program = ObjectImage::parse(program).map_err(|e| JsError::new(&e.to_string()))?;

        self.vm.reset();
        self.vm.console_mut().clear_input();
        self.vm.console_mut().take_output();

        match self.vm.load_operating_system_image() {
            Ok(()) | Err(crate::image::LoadError::NoOperatingSystem) => {}
            Err(e) => return Err(JsError::new(&e.to_string())),
        }
        self.vm.load(&program).map_err(|e| JsError::new(&e.to_string()))?;
        self.vm.schedule_execution();
        Ok(())
    }

    /// Does the machine want another frame?
    #[wasm_bindgen]
    pub fn wants_frame(&self) -> bool {
        self.vm.host().is_due()
    }

    /// Run this frame's slice. Returns the run state name.
    #[wasm_bindgen]
    pub fn run_frame(&mut self) -> String {
        self.vm.poll_frame();
        format!("{:?}", self.vm.state())
    }

    /// Queue a keystroke and wake the program if it is waiting.
    #[wasm_bindgen]
    pub fn push_key(&mut self, code: u8) {
        let code = if code == b'\r' { b'\n' } else { code };
        self.vm.console_mut().push_key(code);
        self.vm.notify_input_available();
    }

    /// Drain output as terminal text.
    #[wasm_bindgen]
    pub fn take_output(&mut self) -> String {
        to_terminal_text(&self.vm.console_mut().take_output())
    }

    /// Raw output characters, undrained copy.
    #[wasm_bindgen]
    pub fn output_codes(&self) -> js_sys::Uint16Array {
        js_sys::Uint16Array::from(self.vm.console().output())
    }

    /// Get cycle count.
    #[wasm_bindgen]
    pub fn cycles(&self) -> u64 {
        self.vm.cpu.cycles
    }

    /// Get program counter.
    #[wasm_bindgen]
    pub fn pc(&self) -> u16 {
        self.vm.cpu.regs.pc
    }

    /// Get memory cell value.
    #[wasm_bindgen]
    pub fn memory_at(&self, addr: u16) -> u16 {
        self.vm.cpu.mem.read(addr)
    }

    /// Why the machine halted, if it did.
    #[wasm_bindgen]
    pub fn halt_reason(&self) -> Option<String> {
        self.vm.halt_reason().map(|e| e.to_string())
    }

    /// Get registers as JSON string.
    #[wasm_bindgen]
    pub fn registers_json(&self) -> Result<String, JsError> {
        serde_json::to_string(&self.vm.cpu.regs).map_err(|e| JsError::new(&e.to_string()))
    }
}
