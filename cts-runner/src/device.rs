// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Capabilities consumed from the device under test.
//!
//! The harness never talks to a device directly. Device transports implement [`Device`], and
//! streaming command output is delivered to a [`ShellOutputReceiver`] chunk by chunk.

use crate::errors::DeviceError;

/// A connected device that tests can be run on.
pub trait Device {
    /// Returns the device serial, used in logs and written to the result document as `deviceID`.
    fn serial(&self) -> &str;

    /// Runs a shell command on the device and returns its complete output.
    fn execute_shell_command(&mut self, command: &str) -> Result<String, DeviceError>;

    /// Runs a shell command on the device, delivering output to `receiver` as it arrives.
    ///
    /// Implementations call [`ShellOutputReceiver::flush`] once the command has finished, and stop
    /// early if [`ShellOutputReceiver::is_cancelled`] returns true.
    fn execute_shell_command_streaming(
        &mut self,
        command: &str,
        receiver: &mut dyn ShellOutputReceiver,
    ) -> Result<(), DeviceError>;

    /// Writes `contents` to `remote_path` on the device, replacing any existing file.
    fn push_string(&mut self, contents: &str, remote_path: &str) -> Result<(), DeviceError>;
}

/// Receives the output of a streaming shell command.
pub trait ShellOutputReceiver {
    /// Called with each chunk of output. Chunk boundaries are arbitrary: a chunk may end in the
    /// middle of a line, or in the middle of a UTF-8 sequence.
    fn add_output(&mut self, data: &[u8]);

    /// Called once the command has finished and all output has been delivered.
    fn flush(&mut self);

    /// Returns true if the receiver no longer wants output.
    fn is_cancelled(&self) -> bool {
        false
    }
}
