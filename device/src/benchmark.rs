use std::ptr;

use cryptlog_shim::calls;

use crate::{
    device::Device,
    error::Error,
    params::{Params, PbkdfParams},
};

/// Cipher throughput in MiB/s
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CipherBenchmark {
    pub encryption_mbs: f64,
    pub decryption_mbs: f64,
}

/// Key derivation cost the library settled on for the requested time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PbkdfBenchmark {
    pub iterations: u32,
    pub max_memory_kb: u32,
    pub parallel_threads: u32,
}

impl Device {
    /// Measure the throughput of the cipher in `params` over a `buffer_size` byte buffer
    pub fn benchmark(
        &mut self,
        params: &Params,
        iv_size: usize,
        buffer_size: usize,
    ) -> Result<CipherBenchmark, Error> {
        let cipher = to_cstring!(params.cipher)?;
        let mode = to_cstring!(params.mode)?;
        let mut encryption_mbs = 0f64;
        let mut decryption_mbs = 0f64;
        self.call(|ls, cd| unsafe {
            calls::crypt_benchmark(
                ls,
                cd,
                cipher.as_ptr(),
                mode.as_ptr(),
                params.volume_key_size,
                iv_size,
                buffer_size,
                &mut encryption_mbs as *mut f64,
                &mut decryption_mbs as *mut f64,
            )
        })?;
        Ok(CipherBenchmark {
            encryption_mbs,
            decryption_mbs,
        })
    }

    /// Measure how expensive the KDF in `params` must be to take its target time
    pub fn benchmark_pbkdf(
        &mut self,
        params: &PbkdfParams,
        password: &[u8],
        salt: &[u8],
        volume_key_size: usize,
    ) -> Result<PbkdfBenchmark, Error> {
        let hash = to_cstring!(params.hash)?;
        let mut pbkdf = params.to_native(&hash);
        self.call(|ls, cd| unsafe {
            calls::crypt_benchmark_pbkdf(
                ls,
                cd,
                &mut pbkdf as *mut _,
                to_byte_ptr!(password),
                password.len(),
                to_byte_ptr!(salt),
                salt.len(),
                volume_key_size,
                None,
                ptr::null_mut(),
            )
        })?;
        Ok(PbkdfBenchmark {
            iterations: pbkdf.iterations,
            max_memory_kb: pbkdf.max_memory_kb,
            parallel_threads: pbkdf.parallel_threads,
        })
    }
}
