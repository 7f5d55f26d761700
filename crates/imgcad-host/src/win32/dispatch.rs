// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Minimal OLE Automation late binding: apartment lifetime, owned `IDispatch`
// pointers, owned `VARIANT`s, and name-based `Invoke`.
//
// ## Ownership rules
//
// - `Dispatch` holds one reference on the interface and releases it on drop.
//   Every `Dispatch` also holds the `Apartment`, so the apartment is left only
//   after the last interface pointer is gone.
// - `Variant` owns whatever it contains (BSTR, SAFEARRAY, IDispatch) and frees
//   it with `VariantClear` on drop.

#![cfg(windows)]

use std::ffi::OsStr;
use std::os::windows::ffi::OsStrExt;
use std::ptr::{self, NonNull};
use std::rc::Rc;

use imgcad_core::error::{ImgcadError, Result};
use winapi::Interface;
use winapi::ctypes::c_void;
use winapi::shared::guiddef::{CLSID, GUID, IID_NULL, REFCLSID};
use winapi::shared::winerror::{DISP_E_EXCEPTION, FAILED, HRESULT, RPC_E_CHANGED_MODE};
use winapi::shared::wtypes::{
    BSTR, VARIANT_FALSE, VARIANT_TRUE, VARTYPE, VT_ARRAY, VT_BOOL, VT_BSTR, VT_DISPATCH, VT_EMPTY,
    VT_R8,
};
use winapi::shared::wtypesbase::CLSCTX_LOCAL_SERVER;
use winapi::um::combaseapi::{CLSIDFromProgID, CoCreateInstance, CoInitializeEx, CoUninitialize};
use winapi::um::oaidl::{DISPID, DISPPARAMS, EXCEPINFO, IDispatch, SAFEARRAY, VARIANT};
use winapi::um::objbase::COINIT_APARTMENTTHREADED;
use winapi::um::oleauto::{
    SafeArrayCreateVector, SysAllocStringLen, SysFreeString, SysStringLen, VariantClear,
    VariantInit,
};
use winapi::um::unknwnbase::IUnknown;
use winapi::um::winnt::LOCALE_USER_DEFAULT;

// `IDispatch::Invoke` flags and the named-argument id for property puts.
const DISPATCH_METHOD: u16 = 0x1;
const DISPATCH_PROPERTYGET: u16 = 0x2;
const DISPATCH_PROPERTYPUT: u16 = 0x4;
const DISPID_PROPERTYPUT: DISPID = -3;

// oleaut32 exports that winapi 0.3 does not bind.
#[link(name = "oleaut32")]
unsafe extern "system" {
    fn GetActiveObject(
        rclsid: REFCLSID,
        reserved: *mut c_void,
        unknown: *mut *mut IUnknown,
    ) -> HRESULT;
    fn SafeArrayPutElement(
        array: *mut SAFEARRAY,
        indices: *const i32,
        value: *mut c_void,
    ) -> HRESULT;
}

/// Map a failed `HRESULT` to an automation error for `operation`.
fn check(hr: HRESULT, operation: &str) -> Result<()> {
    if FAILED(hr) {
        return Err(ImgcadError::automation(
            operation,
            format!("HRESULT 0x{:08X}", hr as u32),
        ));
    }
    Ok(())
}

/// NUL-terminated UTF-16 copy of `s`.
fn wide(s: &OsStr) -> Vec<u16> {
    s.encode_wide().chain(std::iter::once(0)).collect()
}

/// Take ownership of a BSTR and return it as a `String`. Null yields "".
///
/// # Safety
/// `bstr` must be null or a BSTR allocated by the OLE allocator.
unsafe fn take_bstr(bstr: BSTR) -> String {
    if bstr.is_null() {
        return String::new();
    }
    // SAFETY: caller guarantees a live BSTR; its length prefix covers `len` units.
    let len = unsafe { SysStringLen(bstr) } as usize;
    let text = String::from_utf16_lossy(unsafe { std::slice::from_raw_parts(bstr, len) });
    unsafe { SysFreeString(bstr) };
    text
}

// ---------------------------------------------------------------------------
// Apartment
// ---------------------------------------------------------------------------

/// Single-threaded COM apartment for the calling thread.
pub struct Apartment {
    /// False when the thread was already in a multi-threaded apartment, in
    /// which case we must not balance with `CoUninitialize`.
    owns: bool,
}

impl Apartment {
    pub fn enter() -> Result<Rc<Self>> {
        // SAFETY: reserved pointer must be null; called once per session.
        let hr = unsafe { CoInitializeEx(ptr::null_mut(), COINIT_APARTMENTTHREADED) };
        if hr == RPC_E_CHANGED_MODE {
            tracing::debug!("thread already in MTA; reusing it");
            return Ok(Rc::new(Self { owns: false }));
        }
        check(hr, "CoInitializeEx")?;
        Ok(Rc::new(Self { owns: true }))
    }
}

impl Drop for Apartment {
    fn drop(&mut self) {
        if self.owns {
            // SAFETY: balances the successful CoInitializeEx in `enter`.
            unsafe { CoUninitialize() };
        }
    }
}

// ---------------------------------------------------------------------------
// Variant
// ---------------------------------------------------------------------------

/// An owned `VARIANT`.
#[repr(transparent)]
pub struct Variant(VARIANT);

impl Variant {
    pub fn empty() -> Self {
        // SAFETY: VARIANT is plain data and all-zero is VT_EMPTY.
        let mut raw: VARIANT = unsafe { std::mem::zeroed() };
        // SAFETY: `raw` is a valid, exclusively borrowed VARIANT.
        unsafe { VariantInit(&mut raw) };
        Self(raw)
    }

    fn vt(&self) -> VARTYPE {
        // SAFETY: reading the discriminant of an initialised VARIANT.
        unsafe { self.0.n1.n2().vt }
    }

    pub fn from_f64(value: f64) -> Self {
        let mut v = Self::empty();
        // SAFETY: setting the discriminant together with the matching field.
        unsafe {
            let inner = v.0.n1.n2_mut();
            inner.vt = VT_R8 as VARTYPE;
            *inner.n3.dblVal_mut() = value;
        }
        v
    }

    pub fn from_bool(value: bool) -> Self {
        let mut v = Self::empty();
        // SAFETY: setting the discriminant together with the matching field.
        unsafe {
            let inner = v.0.n1.n2_mut();
            inner.vt = VT_BOOL as VARTYPE;
            *inner.n3.boolVal_mut() = if value { VARIANT_TRUE } else { VARIANT_FALSE };
        }
        v
    }

    /// BSTR variant holding `s`.
    pub fn from_os_str(s: &OsStr) -> Result<Self> {
        let units: Vec<u16> = s.encode_wide().collect();
        // SAFETY: `units` outlives the call; the allocator copies it.
        let bstr = unsafe { SysAllocStringLen(units.as_ptr(), units.len() as u32) };
        if bstr.is_null() {
            return Err(ImgcadError::automation("SysAllocStringLen", "out of memory"));
        }
        let mut v = Self::empty();
        // SAFETY: the variant takes ownership of `bstr` and frees it on drop.
        unsafe {
            let inner = v.0.n1.n2_mut();
            inner.vt = VT_BSTR as VARTYPE;
            *inner.n3.bstrVal_mut() = bstr;
        }
        Ok(v)
    }

    /// `VT_ARRAY | VT_R8` variant, the shape AutoCAD expects for points.
    pub fn from_doubles(values: &[f64]) -> Result<Self> {
        // SAFETY: creates a zero-based one-dimensional array of doubles.
        let array = unsafe { SafeArrayCreateVector(VT_R8 as VARTYPE, 0, values.len() as u32) };
        if array.is_null() {
            return Err(ImgcadError::automation("SafeArrayCreateVector", "out of memory"));
        }
        let mut v = Self::empty();
        // SAFETY: the variant takes ownership of `array` and frees it on drop.
        unsafe {
            let inner = v.0.n1.n2_mut();
            inner.vt = (VT_ARRAY | VT_R8) as VARTYPE;
            *inner.n3.parray_mut() = array;
        }
        // From here `v` owns the array; early returns free it via VariantClear.
        for (index, value) in values.iter().enumerate() {
            let index = index as i32;
            let mut value = *value;
            // SAFETY: `index` is within the bounds the array was created with and
            // `value` is a VT_R8 element; the array copies it.
            let hr = unsafe {
                SafeArrayPutElement(array, &index, &mut value as *mut f64 as *mut c_void)
            };
            check(hr, "SafeArrayPutElement")?;
        }
        Ok(v)
    }

    /// Move the contained `IDispatch` out of this variant.
    pub fn into_dispatch(mut self, apartment: &Rc<Apartment>, operation: &str) -> Result<Dispatch> {
        if self.vt() != VT_DISPATCH as VARTYPE {
            return Err(ImgcadError::automation(
                operation,
                format!("expected an object, got VARTYPE {}", self.vt()),
            ));
        }
        // SAFETY: discriminant checked above. Resetting to VT_EMPTY transfers
        // the reference to the returned `Dispatch` instead of VariantClear.
        let raw = unsafe {
            let inner = self.0.n1.n2_mut();
            let raw = *inner.n3.pdispVal();
            inner.vt = VT_EMPTY as VARTYPE;
            raw
        };
        Dispatch::from_raw(raw, Rc::clone(apartment))
            .ok_or_else(|| ImgcadError::automation(operation, "host returned a null object"))
    }

    /// Contents of a BSTR variant.
    pub fn into_string(mut self, operation: &str) -> Result<String> {
        if self.vt() != VT_BSTR as VARTYPE {
            return Err(ImgcadError::automation(
                operation,
                format!("expected a string, got VARTYPE {}", self.vt()),
            ));
        }
        // SAFETY: discriminant checked; ownership of the BSTR moves to take_bstr.
        let text = unsafe {
            let inner = self.0.n1.n2_mut();
            let bstr = *inner.n3.bstrVal();
            inner.vt = VT_EMPTY as VARTYPE;
            take_bstr(bstr)
        };
        Ok(text)
    }
}

impl Drop for Variant {
    fn drop(&mut self) {
        // SAFETY: frees whatever the discriminant says we own.
        unsafe { VariantClear(&mut self.0) };
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// An owned `IDispatch` reference.
pub struct Dispatch {
    ptr: NonNull<IDispatch>,
    apartment: Rc<Apartment>,
}

impl Dispatch {
    /// Adopt an already-counted reference. Returns `None` for null.
    pub fn from_raw(raw: *mut IDispatch, apartment: Rc<Apartment>) -> Option<Self> {
        NonNull::new(raw).map(|ptr| Self { ptr, apartment })
    }

    /// Attach to a running instance of `prog_id`, or launch one.
    pub fn attach_or_create(prog_id: &str, apartment: &Rc<Apartment>) -> Result<(Self, bool)> {
        let wide_id = wide(OsStr::new(prog_id));
        let mut clsid: CLSID = GUID {
            Data1: 0,
            Data2: 0,
            Data3: 0,
            Data4: [0; 8],
        };
        // SAFETY: `wide_id` is NUL-terminated and outlives the call.
        check(
            unsafe { CLSIDFromProgID(wide_id.as_ptr(), &mut clsid) },
            "CLSIDFromProgID",
        )?;

        let mut unknown: *mut IUnknown = ptr::null_mut();
        // SAFETY: reserved pointer is null; the out slot receives one reference.
        let hr = unsafe { GetActiveObject(&clsid, ptr::null_mut(), &mut unknown) };
        if !FAILED(hr) && !unknown.is_null() {
            let mut raw: *mut IDispatch = ptr::null_mut();
            // SAFETY: `unknown` is a live reference returned by GetActiveObject.
            let hr = unsafe {
                let hr = (*unknown).QueryInterface(
                    &IDispatch::uuidof(),
                    &mut raw as *mut *mut IDispatch as *mut *mut c_void,
                );
                (*unknown).Release();
                hr
            };
            check(hr, "QueryInterface(IDispatch)")?;
            let dispatch = Self::from_raw(raw, Rc::clone(apartment)).ok_or_else(|| {
                ImgcadError::automation("GetActiveObject", "null IDispatch")
            })?;
            return Ok((dispatch, true));
        }

        let mut raw: *mut IDispatch = ptr::null_mut();
        // SAFETY: out-pointer receives one reference on success.
        let hr = unsafe {
            CoCreateInstance(
                &clsid,
                ptr::null_mut(),
                CLSCTX_LOCAL_SERVER,
                &IDispatch::uuidof(),
                &mut raw as *mut *mut IDispatch as *mut *mut c_void,
            )
        };
        check(hr, "CoCreateInstance")?;
        let dispatch = Self::from_raw(raw, Rc::clone(apartment))
            .ok_or_else(|| ImgcadError::automation("CoCreateInstance", "null IDispatch"))?;
        Ok((dispatch, false))
    }

    pub fn apartment(&self) -> &Rc<Apartment> {
        &self.apartment
    }

    fn dispid(&self, name: &str) -> Result<DISPID> {
        let mut wide_name = wide(OsStr::new(name));
        let mut names = [wide_name.as_mut_ptr()];
        let mut id: DISPID = 0;
        // SAFETY: one NUL-terminated name, one out slot.
        let hr = unsafe {
            self.ptr.as_ref().GetIDsOfNames(
                &IID_NULL,
                names.as_mut_ptr(),
                1,
                LOCALE_USER_DEFAULT,
                &mut id,
            )
        };
        check(hr, name)?;
        Ok(id)
    }

    /// Invoke member `name`. `args` are in natural (left-to-right) order.
    fn invoke(&self, name: &str, flags: u16, mut args: Vec<Variant>) -> Result<Variant> {
        let id = self.dispid(name)?;
        // DISPPARAMS takes arguments right-to-left.
        args.reverse();

        let mut named = DISPID_PROPERTYPUT;
        let is_put = flags == DISPATCH_PROPERTYPUT;
        let mut params = DISPPARAMS {
            rgvarg: args.as_mut_ptr() as *mut VARIANT,
            rgdispidNamedArgs: if is_put { &mut named } else { ptr::null_mut() },
            cArgs: args.len() as u32,
            cNamedArgs: if is_put { 1 } else { 0 },
        };

        let mut result = Variant::empty();
        // SAFETY: EXCEPINFO is plain data; null BSTRs and a None callback are valid.
        let mut excep: EXCEPINFO = unsafe { std::mem::zeroed() };
        let mut arg_err: u32 = 0;

        // SAFETY: all pointers reference locals that outlive the call;
        // `Variant` is repr(transparent) over VARIANT.
        let hr = unsafe {
            self.ptr.as_ref().Invoke(
                id,
                &IID_NULL,
                LOCALE_USER_DEFAULT,
                flags,
                &mut params,
                &mut result.0,
                &mut excep,
                &mut arg_err,
            )
        };

        if hr == DISP_E_EXCEPTION {
            // SAFETY: on DISP_E_EXCEPTION the callee filled EXCEPINFO and we
            // own its BSTRs.
            let (description, source) = unsafe {
                SysFreeString(excep.bstrHelpFile);
                (take_bstr(excep.bstrDescription), take_bstr(excep.bstrSource))
            };
            let detail = match (description.is_empty(), source.is_empty()) {
                (false, false) => format!("{description} ({source})"),
                (false, true) => description,
                _ => format!("exception code {}", excep.scode),
            };
            return Err(ImgcadError::automation(name, detail));
        }
        check(hr, name)?;
        Ok(result)
    }

    pub fn get(&self, name: &str) -> Result<Variant> {
        self.invoke(name, DISPATCH_PROPERTYGET, Vec::new())
    }

    pub fn get_object(&self, name: &str) -> Result<Dispatch> {
        self.get(name)?.into_dispatch(&self.apartment, name)
    }

    pub fn put(&self, name: &str, value: Variant) -> Result<()> {
        self.invoke(name, DISPATCH_PROPERTYPUT, vec![value]).map(drop)
    }

    pub fn call(&self, name: &str, args: Vec<Variant>) -> Result<Variant> {
        self.invoke(name, DISPATCH_METHOD, args)
    }
}

impl Drop for Dispatch {
    fn drop(&mut self) {
        // SAFETY: we hold exactly one reference.
        unsafe { self.ptr.as_ref().Release() };
    }
}
