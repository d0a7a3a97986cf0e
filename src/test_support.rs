use std::io::Cursor;
use std::sync::{Arc, Mutex};

use image::{GrayImage, ImageFormat};

use crate::client::{Client, ClientConfig, ClientInner, Credentials, Endpoints, HttpOptions};

static ENV_LOCK: Mutex<()> = Mutex::new(());

pub fn with_env(vars: &[(&str, Option<&str>)], f: impl FnOnce()) {
    let _guard = ENV_LOCK.lock().unwrap();
    let backup: Vec<(String, Option<String>)> = vars
        .iter()
        .map(|(key, _)| ((*key).to_string(), std::env::var(key).ok()))
        .collect();
    for (key, value) in vars {
        match value {
            Some(value) => std::env::set_var(key, value),
            None => std::env::remove_var(key),
        }
    }
    f();
    for (key, value) in backup {
        match value {
            Some(value) => std::env::set_var(key, value),
            None => std::env::remove_var(key),
        }
    }
}

pub fn test_inner_with_base(vision_base: &str, vertex_base: &str) -> ClientInner {
    let http_options = HttpOptions {
        vision_base_url: Some(vision_base.to_string()),
        vertex_base_url: Some(vertex_base.to_string()),
        ..Default::default()
    };
    let config = ClientConfig {
        project: "proj".to_string(),
        location: "loc".to_string(),
        credentials: Credentials::ApplicationDefault,
        http_options,
        auth_scopes: Vec::new(),
    };
    let endpoints = Endpoints::new(&config);
    ClientInner {
        http: reqwest::Client::new(),
        config,
        endpoints,
        auth_provider: None,
    }
}

pub fn test_client_with_base(vision_base: &str, vertex_base: &str) -> Client {
    Client {
        inner: Arc::new(test_inner_with_base(vision_base, vertex_base)),
    }
}

pub fn tiny_png() -> Vec<u8> {
    tiny_png_sized(4, 4)
}

pub fn tiny_png_sized(width: u32, height: u32) -> Vec<u8> {
    let image = GrayImage::new(width, height);
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, ImageFormat::Png).unwrap();
    buffer.into_inner()
}
