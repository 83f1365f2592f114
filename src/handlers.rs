use crate::compression::{CompressionRequest, SourceImage};
use crate::config::{AppConfig, CompressionConfig, CorsConfig};
use crate::error::{ApiError, CompressionError};
use crate::format::{ImageFormat, OutputFormat};
use crate::models::*;
use crate::services::ImageCompressionService;
use crate::utils::detect_media_type;
use base64::{Engine as _, engine::general_purpose};
use bytes::Bytes;
use futures_util::{StreamExt, stream};
use hyper::body::HttpBody;
use hyper::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use hyper::{Body, Method, Request, Response, StatusCode};
use lambda_runtime::{Error, LambdaEvent};
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio_util::sync::CancellationToken;

/// Transport-neutral request, built from either a hyper request or a Lambda event.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub content_type: Option<String>,
    pub query: HashMap<String, String>,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: StatusCode,
    /// `None` for bodiless replies such as CORS preflight.
    pub body: Option<Value>,
}

impl ApiResponse {
    fn json(status: StatusCode, body: Value) -> Self {
        Self {
            status,
            body: Some(body),
        }
    }

    fn empty(status: StatusCode) -> Self {
        Self { status, body: None }
    }
}

#[derive(Debug)]
struct UploadedFile {
    field: String,
    file_name: String,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

#[derive(Debug, Default)]
struct MultipartForm {
    fields: HashMap<String, String>,
    files: Vec<UploadedFile>,
}

impl MultipartForm {
    fn take_files(&mut self, field: &str) -> Vec<UploadedFile> {
        let (matching, rest) = std::mem::take(&mut self.files)
            .into_iter()
            .partition(|file| file.field == field);
        self.files = rest;
        matching
    }
}

pub struct ImageHandler {
    compression_service: Arc<ImageCompressionService>,
    cors_config: CorsConfig,
    limits: CompressionConfig,
    timeout: Duration,
    started: Instant,
}

impl ImageHandler {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            compression_service: Arc::new(ImageCompressionService::new(&config.compression)),
            cors_config: config.cors.clone(),
            limits: config.compression.clone(),
            timeout: config.compression.timeout(),
            started: Instant::now(),
        }
    }

    pub async fn handle_http_request(
        &self,
        req: Request<Body>,
    ) -> Result<Response<Body>, Infallible> {
        let origin = req
            .headers()
            .get("origin")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let query = self.parse_query_params(req.uri().query().unwrap_or(""));
        let content_type = self.get_content_type(req.headers());
        let declared_length = req
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<usize>().ok());

        let response = match self.read_body(req.into_body(), declared_length).await {
            Ok(body) => {
                self.dispatch(ApiRequest {
                    method,
                    path,
                    content_type,
                    query,
                    body,
                })
                .await
            }
            Err(e) => self.error_response(e),
        };

        Ok(self.create_cors_response(response, origin.as_deref()))
    }

    pub async fn handle_lambda_event(&self, event: LambdaEvent<Value>) -> Result<Value, Error> {
        let payload = &event.payload;
        let origin = self.get_event_header(payload, "origin");

        let method = self
            .get_event_method(payload)
            .and_then(|m| Method::from_bytes(m.as_bytes()).ok())
            .unwrap_or_default();
        let path = self
            .get_event_path(payload)
            .unwrap_or_else(|| "/".to_string());

        let response = match self.get_event_body_bytes(payload) {
            Ok(body) if body.len() > self.limits.max_request_size() => {
                self.error_response(ApiError::PayloadTooLarge)
            }
            Ok(body) => {
                self.dispatch(ApiRequest {
                    method,
                    path,
                    content_type: self.get_event_header(payload, "content-type"),
                    query: self.get_event_query_params(payload),
                    body,
                })
                .await
            }
            Err(e) => self.error_response(e),
        };

        Ok(self.create_lambda_response(response, origin.as_deref()))
    }

    /// 408 reply for requests cut off by the server-wide timeout.
    pub fn timeout_response(&self) -> Response<Body> {
        self.create_cors_response(self.error_response(ApiError::Timeout), None)
    }

    /// Routes a request to its endpoint. Shared by the HTTP server and the Lambda runtime.
    #[tracing::instrument(skip_all, fields(method = %request.method, path = %request.path))]
    pub async fn dispatch(&self, request: ApiRequest) -> ApiResponse {
        let started = Instant::now();

        let result = match (&request.method, request.path.as_str()) {
            (&Method::OPTIONS, _) => return ApiResponse::empty(StatusCode::OK),
            (&Method::GET, "/api/health") => self.health(),
            (&Method::POST, "/api/compress") => self.compress(request).await,
            (&Method::POST, "/api/resize") => self.resize(request).await,
            (&Method::POST, "/api/convert") => self.convert(request).await,
            (&Method::POST, "/api/batch-process") => self.batch_process(request).await,
            (&Method::POST, "/api/metadata") => self.metadata(request).await,
            _ => Err(ApiError::NotFound),
        };

        let response = match result {
            Ok(body) => ApiResponse::json(StatusCode::OK, body),
            Err(e) => self.error_response(e),
        };

        tracing::info!(
            status = response.status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "request handled"
        );
        response
    }

    fn health(&self) -> Result<Value, ApiError> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        to_json(&HealthResponse {
            status: "healthy",
            timestamp,
            uptime_seconds: self.started.elapsed().as_secs_f64(),
        })
    }

    async fn compress(&self, request: ApiRequest) -> Result<Value, ApiError> {
        let mut form = self
            .parse_multipart(request.content_type.as_deref(), request.body)
            .await?;
        let files = self.require_files(&mut form, self.limits.max_files)?;
        let params = merge_params(request.query, form.fields);

        let compression_request = self.build_compression_request(&params)?;
        compression_request.validate()?;

        let names: Vec<String> = files.iter().map(|f| f.file_name.clone()).collect();
        let images = files
            .into_iter()
            .map(|f| SourceImage::with_media_type(f.file_name, f.content_type.as_deref(), f.bytes))
            .collect();

        let cancel = CancellationToken::new();
        let results = match tokio::time::timeout(
            self.timeout,
            self.compression_service
                .compress_images(images, compression_request, cancel.clone()),
        )
        .await
        {
            Ok(results) => results,
            Err(_) => {
                cancel.cancel();
                return Err(ApiError::Timeout);
            }
        };

        let outcomes = names
            .iter()
            .zip(results)
            .map(|(name, result)| match result {
                Ok(result) => FileOutcome::Done(CompressedImage::from_result(name, &result)),
                Err(e) => FileOutcome::Failed(FailedImage {
                    original_name: name.clone(),
                    error: e.to_string(),
                }),
            })
            .collect();

        to_json(&BatchResponse::new(outcomes))
    }

    async fn resize(&self, request: ApiRequest) -> Result<Value, ApiError> {
        let mut form = self
            .parse_multipart(request.content_type.as_deref(), request.body)
            .await?;
        let file = self.require_single_file(&mut form)?;
        let params = merge_params(request.query, form.fields);

        let width = self.parse_optional_u32(params.get("width"), "width")?;
        let height = self.parse_optional_u32(params.get("height"), "height")?;
        if width.is_none() && height.is_none() {
            return Err(ApiError::BadRequest("Debes enviar width o height".to_string()));
        }

        let mut fit = match params.get("fit") {
            Some(raw) => raw.parse::<ResizeMode>().map_err(ApiError::BadRequest)?,
            None => ResizeMode::default(),
        };
        if params.get("maintainAspectRatio").map(String::as_str) == Some("false") {
            fit = ResizeMode::Force;
        }

        let options = ResizeOptions { width, height, fit };
        let original_size = file.bytes.len();
        let bytes = file.bytes;
        let image = self
            .with_timeout(self.run_blocking(move |service| service.resize(&bytes, &options)))
            .await??;

        to_json(&ResizeResponse {
            success: true,
            original_size,
            new_size: image.bytes.len(),
            width: image.width,
            height: image.height,
            data: general_purpose::STANDARD.encode(&image.bytes),
        })
    }

    async fn convert(&self, request: ApiRequest) -> Result<Value, ApiError> {
        let mut form = self
            .parse_multipart(request.content_type.as_deref(), request.body)
            .await?;
        let file = self.require_single_file(&mut form)?;
        let params = merge_params(request.query, form.fields);

        let format = params
            .get("format")
            .and_then(|f| f.parse::<ImageFormat>().ok())
            .ok_or_else(|| {
                ApiError::BadRequest(
                    "Formato no soportado. Formatos soportados: jpeg, png, webp".to_string(),
                )
            })?;
        let quality = self.parse_quality(params.get("quality"), 90)?;

        let original_format = file
            .content_type
            .clone()
            .unwrap_or_else(|| detect_media_type(&file.bytes).to_string());
        let original_size = file.bytes.len();
        let bytes = file.bytes;
        let image = self
            .with_timeout(self.run_blocking(move |service| service.convert(&bytes, format, quality)))
            .await??;

        to_json(&ConvertResponse {
            success: true,
            original_format,
            new_format: format.mime_type().to_string(),
            original_size,
            new_size: image.bytes.len(),
            data: general_purpose::STANDARD.encode(&image.bytes),
        })
    }

    async fn batch_process(&self, request: ApiRequest) -> Result<Value, ApiError> {
        let mut form = self
            .parse_multipart(request.content_type.as_deref(), request.body)
            .await?;
        let files = self.require_files(&mut form, self.limits.max_batch_files)?;
        let params = merge_params(request.query, form.fields);

        let operations: Vec<ImageOperation> = match params.get("operations") {
            Some(raw) if !raw.trim().is_empty() => serde_json::from_str(raw).map_err(|_| {
                ApiError::BadRequest("operations debe ser un arreglo JSON valido".to_string())
            })?,
            _ => Vec::new(),
        };
        let operations = &operations;

        let work = stream::iter(files.into_iter().enumerate())
            .map(|(index, file)| {
                let operation = operations
                    .get(index)
                    .or_else(|| operations.first())
                    .cloned()
                    .unwrap_or_default();

                async move {
                    let UploadedFile {
                        file_name, bytes, ..
                    } = file;
                    let original_size = bytes.len();
                    let op = operation.clone();
                    let result = self
                        .run_blocking(move |service| service.process(&bytes, &op))
                        .await;

                    match result {
                        Ok(image) => FileOutcome::Done(ProcessedImage::new(
                            &file_name,
                            original_size,
                            operation,
                            image,
                        )),
                        Err(e) => {
                            tracing::warn!(image = %file_name, error = %e, "operation failed");
                            FileOutcome::Failed(FailedImage {
                                original_name: file_name,
                                error: e.to_string(),
                            })
                        }
                    }
                }
            })
            .buffered(self.limits.batch_concurrency.max(1))
            .collect::<Vec<_>>();

        let outcomes = self.with_timeout(work).await?;
        to_json(&BatchResponse::new(outcomes))
    }

    async fn metadata(&self, request: ApiRequest) -> Result<Value, ApiError> {
        let mut form = self
            .parse_multipart(request.content_type.as_deref(), request.body)
            .await?;
        let file = self.require_single_file(&mut form)?;

        let filename = file.file_name;
        let size = file.bytes.len();
        let bytes = file.bytes;
        let metadata = self
            .with_timeout(self.run_blocking(move |service| service.metadata(&bytes)))
            .await??;

        to_json(&MetadataResponse {
            success: true,
            filename,
            size,
            metadata,
        })
    }

    /// Runs CPU-bound image work on the blocking pool.
    async fn run_blocking<T, F>(&self, work: F) -> Result<T, CompressionError>
    where
        F: FnOnce(&ImageCompressionService) -> Result<T, CompressionError> + Send + 'static,
        T: Send + 'static,
    {
        let service = Arc::clone(&self.compression_service);
        tokio::task::spawn_blocking(move || work(&service))
            .await
            .unwrap_or_else(|e| Err(CompressionError::Task(e.to_string())))
    }

    async fn with_timeout<T>(&self, work: impl Future<Output = T>) -> Result<T, ApiError> {
        tokio::time::timeout(self.timeout, work)
            .await
            .map_err(|_| ApiError::Timeout)
    }

    fn build_compression_request(
        &self,
        params: &HashMap<String, String>,
    ) -> Result<CompressionRequest, ApiError> {
        let quality = self.parse_quality(params.get("quality"), self.limits.default_quality)?;

        let output_format = match params.get("format") {
            Some(raw) => raw.parse::<OutputFormat>().map_err(|_| {
                ApiError::BadRequest(
                    "Parametro format invalido (original, jpeg, png, webp)".to_string(),
                )
            })?,
            None => OutputFormat::Original,
        };

        let max_width = self
            .parse_positive_u32(params.get("maxWidth"), "maxWidth")?
            .unwrap_or(self.limits.max_width);
        let max_height = self
            .parse_positive_u32(params.get("maxHeight"), "maxHeight")?
            .unwrap_or(self.limits.max_height);

        let max_kb = params.get("maxFileSizeKB");
        let method = params
            .get("method")
            .map(String::as_str)
            .unwrap_or(if max_kb.is_some() { "size" } else { "quality" });

        let request = match method {
            "quality" => self.limits.default_request().with_quality_percent(quality),
            "size" | "targetSize" | "target_size" => {
                let max_kb = max_kb
                    .ok_or_else(|| {
                        ApiError::BadRequest("maxFileSizeKB es requerido con method=size".to_string())
                    })?
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| ApiError::BadRequest("Parametro maxFileSizeKB invalido".to_string()))?;
                CompressionRequest::target_size_kb(max_kb).with_quality_percent(quality)
            }
            _ => {
                return Err(ApiError::BadRequest(
                    "Parametro method invalido (quality, size)".to_string(),
                ));
            }
        };

        Ok(request
            .with_output_format(output_format)
            .with_max_bounds(max_width, max_height))
    }

    async fn read_body(
        &self,
        mut body: Body,
        declared_length: Option<usize>,
    ) -> Result<Vec<u8>, ApiError> {
        let limit = self.limits.max_request_size();
        if declared_length.is_some_and(|len| len > limit) {
            return Err(ApiError::PayloadTooLarge);
        }

        let mut buffer = Vec::with_capacity(declared_length.unwrap_or(0));
        while let Some(chunk) = body.data().await {
            let chunk = chunk
                .map_err(|_| ApiError::BadRequest("Error leyendo el cuerpo de la peticion".to_string()))?;
            if buffer.len() + chunk.len() > limit {
                return Err(ApiError::PayloadTooLarge);
            }
            buffer.extend_from_slice(&chunk);
        }

        Ok(buffer)
    }

    async fn parse_multipart(
        &self,
        content_type: Option<&str>,
        body_bytes: Vec<u8>,
    ) -> Result<MultipartForm, ApiError> {
        let content_type = content_type
            .filter(|value| self.is_multipart_content_type(Some(value)))
            .ok_or_else(|| {
                ApiError::BadRequest("Content-Type debe ser multipart/form-data".to_string())
            })?;

        let boundary = multer::parse_boundary(content_type)
            .map_err(|_| ApiError::BadRequest("Boundary invalido en Content-Type".to_string()))?;
        let stream = stream::once(async move { Ok::<Bytes, Infallible>(Bytes::from(body_bytes)) });
        let mut multipart = multer::Multipart::new(stream, boundary);

        let mut form = MultipartForm::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|_| ApiError::BadRequest("Error leyendo multipart".to_string()))?
        {
            let name = field.name().unwrap_or_default().to_string();

            let Some(file_name) = field.file_name().map(|s| s.to_string()) else {
                let value = field
                    .text()
                    .await
                    .map_err(|_| ApiError::BadRequest(format!("Error leyendo el campo {name}")))?;
                form.fields.insert(name, value);
                continue;
            };

            let content_type = field.content_type().map(|mime| mime.to_string());
            let bytes = field
                .bytes()
                .await
                .map_err(|_| ApiError::BadRequest("Error leyendo archivo".to_string()))?;

            // Browsers send an empty part when no file was picked.
            if file_name.is_empty() && bytes.is_empty() {
                continue;
            }

            if content_type
                .as_deref()
                .is_some_and(|ct| !ct.starts_with("image/"))
            {
                return Err(ApiError::BadRequest(
                    "Solo se permiten archivos de imagen".to_string(),
                ));
            }
            self.validate_image_size(&bytes)?;

            form.files.push(UploadedFile {
                field: name,
                file_name: if file_name.is_empty() {
                    "image".to_string()
                } else {
                    file_name
                },
                content_type,
                bytes: bytes.to_vec(),
            });
        }

        Ok(form)
    }

    fn require_files(&self, form: &mut MultipartForm, limit: usize) -> Result<Vec<UploadedFile>, ApiError> {
        let files = form.take_files("images");

        if files.is_empty() {
            return Err(ApiError::BadRequest("No se subieron archivos".to_string()));
        }
        if files.len() > limit {
            return Err(ApiError::BadRequest(format!(
                "Demasiados archivos. Maximo {limit} por peticion"
            )));
        }

        Ok(files)
    }

    fn require_single_file(&self, form: &mut MultipartForm) -> Result<UploadedFile, ApiError> {
        form.take_files("image")
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::BadRequest("No se subio ningun archivo".to_string()))
    }

    fn validate_image_size(&self, bytes: &[u8]) -> Result<(), ApiError> {
        if bytes.len() > self.limits.max_image_size {
            return Err(ApiError::PayloadTooLarge);
        }
        Ok(())
    }

    fn error_response(&self, error: ApiError) -> ApiResponse {
        let status = error.status();
        if status.is_server_error() {
            tracing::error!(error = %error, "request failed");
        } else {
            tracing::warn!(status = status.as_u16(), error = %error, "request rejected");
        }

        let body = serde_json::to_value(ErrorResponse {
            error: error.to_string(),
        })
        .unwrap_or_else(|_| json!({ "error": "Error interno" }));

        ApiResponse::json(status, body)
    }

    fn cors_headers(&self, origin: Option<&str>) -> Vec<(&'static str, String)> {
        vec![
            ("Content-Type", "application/json".to_string()),
            ("Access-Control-Allow-Origin", self.get_allowed_origin(origin)),
            ("Access-Control-Allow-Methods", "GET, POST, OPTIONS".to_string()),
            (
                "Access-Control-Allow-Headers",
                "Content-Type, Authorization".to_string(),
            ),
        ]
    }

    fn create_cors_response(&self, response: ApiResponse, origin: Option<&str>) -> Response<Body> {
        let body = match response.body {
            Some(value) => Body::from(value.to_string()),
            None => Body::empty(),
        };

        let mut http_response = Response::new(body);
        *http_response.status_mut() = response.status;

        let headers = http_response.headers_mut();
        for (name, value) in self.cors_headers(origin) {
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(&value),
            ) {
                headers.insert(name, value);
            }
        }

        http_response
    }

    fn create_lambda_response(&self, response: ApiResponse, origin: Option<&str>) -> Value {
        let headers: serde_json::Map<String, Value> = self
            .cors_headers(origin)
            .into_iter()
            .map(|(name, value)| (name.to_string(), json!(value)))
            .collect();

        json!({
            "statusCode": response.status.as_u16(),
            "headers": headers,
            "body": response.body.map(|b| b.to_string()).unwrap_or_default(),
        })
    }

    fn get_allowed_origin(&self, origin: Option<&str>) -> String {
        let allows_any = self.cors_config.allowed_origins.iter().any(|o| o == "*");

        match origin {
            _ if allows_any => "*".to_string(),
            Some(origin_value)
                if self
                    .cors_config
                    .allowed_origins
                    .iter()
                    .any(|o| o == origin_value) =>
            {
                origin_value.to_string()
            }
            _ => "null".to_string(),
        }
    }

    fn get_content_type(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string())
    }

    fn is_multipart_content_type(&self, content_type: Option<&str>) -> bool {
        content_type
            .map(|value| value.to_lowercase().starts_with("multipart/form-data"))
            .unwrap_or(false)
    }

    fn parse_query_params(&self, query: &str) -> HashMap<String, String> {
        url::form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect()
    }

    fn parse_quality(&self, value: Option<&String>, default: u8) -> Result<u8, ApiError> {
        let Some(raw) = value else {
            return Ok(default);
        };

        match raw.trim().parse::<u8>() {
            Ok(quality) if quality <= 100 => Ok(quality),
            _ => Err(ApiError::BadRequest(
                "Parametro quality invalido (0-100)".to_string(),
            )),
        }
    }

    fn parse_optional_u32(
        &self,
        value: Option<&String>,
        name: &str,
    ) -> Result<Option<u32>, ApiError> {
        match value.map(|v| v.trim()).filter(|v| !v.is_empty()) {
            None => Ok(None),
            Some(raw) => raw
                .parse::<u32>()
                .map(Some)
                .map_err(|_| ApiError::BadRequest(format!("Parametro {name} invalido"))),
        }
    }

    fn parse_positive_u32(
        &self,
        value: Option<&String>,
        name: &str,
    ) -> Result<Option<u32>, ApiError> {
        match self.parse_optional_u32(value, name)? {
            Some(0) => Err(ApiError::BadRequest(format!(
                "{name} debe ser mayor que cero"
            ))),
            other => Ok(other),
        }
    }

    fn get_event_method(&self, payload: &Value) -> Option<String> {
        payload
            .get("requestContext")
            .and_then(|ctx| ctx.get("http"))
            .and_then(|http| http.get("method"))
            .and_then(|v| v.as_str())
            .map(|v| v.to_string())
            .or_else(|| {
                payload
                    .get("httpMethod")
                    .and_then(|v| v.as_str())
                    .map(|v| v.to_string())
            })
    }

    fn get_event_path(&self, payload: &Value) -> Option<String> {
        payload
            .get("rawPath")
            .and_then(|v| v.as_str())
            .map(|v| v.to_string())
            .or_else(|| {
                payload
                    .get("path")
                    .and_then(|v| v.as_str())
                    .map(|v| v.to_string())
            })
    }

    fn get_event_header(&self, payload: &Value, name: &str) -> Option<String> {
        let headers = payload.get("headers")?;
        let name_lower = name.to_lowercase();
        headers.as_object().and_then(|map| {
            map.iter().find_map(|(key, value)| {
                if key.to_lowercase() == name_lower {
                    value.as_str().map(|v| v.to_string())
                } else {
                    None
                }
            })
        })
    }

    fn get_event_query_params(&self, payload: &Value) -> HashMap<String, String> {
        if let Some(raw) = payload.get("rawQueryString").and_then(|v| v.as_str()) {
            if !raw.is_empty() {
                return self.parse_query_params(raw);
            }
        }

        payload
            .get("queryStringParameters")
            .and_then(|v| v.as_object())
            .map(|map| {
                map.iter()
                    .filter_map(|(key, value)| {
                        value.as_str().map(|v| (key.clone(), v.to_string()))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn get_event_body_bytes(&self, payload: &Value) -> Result<Vec<u8>, ApiError> {
        let body = payload.get("body").and_then(|v| v.as_str()).unwrap_or("");

        let is_base64 = payload
            .get("isBase64Encoded")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        if is_base64 {
            general_purpose::STANDARD
                .decode(body)
                .map_err(|_| ApiError::BadRequest("Body base64 invalido".to_string()))
        } else {
            Ok(body.as_bytes().to_vec())
        }
    }
}

/// Form fields override query-string parameters of the same name.
fn merge_params(
    query: HashMap<String, String>,
    fields: HashMap<String, String>,
) -> HashMap<String, String> {
    let mut params = query;
    params.extend(fields);
    params
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, ApiError> {
    serde_json::to_value(value).map_err(|e| ApiError::Internal(e.to_string()))
}
