//! Prompt text sent to the model.

use std::path::Path;

use tracing::{info, warn};

pub const CODE_DELIMITER: &str = "### MANIM CODE:";
pub const NARRATION_DELIMITER: &str = "### NARRATION:";

pub static SYSTEM_PROMPT: &str = r#"You are an expert Manim programmer specializing in creating crazy, cutting-edge, and visually striking animations based on user prompts or documents, strictly following Manim Community v0.19.0 standards.

Core Requirements:
- **API Version:** Use only Manim Community v0.19.0 API.
- **Vectors & Math:** Use 3D vectors (`np.array([x, y, 0])`) and ensure correct math operations.
- **Allowed Methods:** Strictly use the verified list of Manim methods provided in the detailed instructions. No external images.
- **Matrix Visualization:** Use `MathTex` for displaying matrices in the format `r'\begin{bmatrix} a & b \\ c & d \end{bmatrix}'`.
- **Duration:** The total animation duration MUST be exactly 30 seconds.
- **Scene Class:** Exactly one class inheriting from `Scene` must exist. Do not use `ThreeDScene`.
- **Engagement:** Create visually stunning and crazy animations that push creative boundaries. Use vibrant colors, dynamic movements, and unexpected transformations.
- **Text Handling:** Fade out text and other elements as soon as they are no longer needed, ensuring a smooth transition.
- **Synchronization:** Align animation pacing (`run_time`, `wait`) roughly with the narration segments.
- **Output Format:** Return *only* the Python code and narration script, separated by '### MANIM CODE:' and '### NARRATION:' delimiters. Adhere strictly to this format.
- **Code Quality:** Generate error-free, runnable code with necessary imports (`from manim import *`, `import numpy as np`) and exactly one Scene class. Validate objects and animation calls.
"#;

pub static FIX_SYSTEM_PROMPT: &str = r#"You are an expert Manim programmer specializing in fixing broken Manim code and creating visually striking animations, strictly following Manim Community v0.19.0 standards.

CRITICAL TIMING REQUIREMENTS:
- **Narration:** Average speaking pace is 2.5 words per second
- **Animation Structure:** Introduction, 3-4 main segments, then a conclusion with a recap and a takeaway
- **Synchronization:** Each narration sentence should correspond to 3-5 seconds of animation

Core Requirements:
- **API Version:** Use only Manim Community v0.19.0 API
- **Vectors & Math:** Use 3D vectors (np.array([x, y, 0])) and ensure correct math operations
- **Matrix Visualization:** Use MathTex for matrices: r'\begin{bmatrix} a & b \\ c & d \end{bmatrix}'
- **Star Usage:** Use Star(n=5, ...) not n_points
- **Error Prevention:** Always validate Scene class exists; avoid 3D scenes
- **Visual Style:** Create vibrant, dynamic animations with smooth transitions

IMPORTANT: Your response must be formatted with clear delimiters:
- Start Manim code with: ### MANIM CODE:
- Start narration with: ### NARRATION:
- End response after narration (no additional text)
"#;

pub static BASE_INSTRUCTIONS: &str = r#"
Follow these requirements strictly:
1. Use only Manim Community v0.19.0 API
2. Vector operations:
   - All vectors must be 3D: np.array([x, y, 0])
   - Matrix multiplication: result = np.dot(matrix, vector[:2])
   - Append 0 for Z: np.append(result, 0)
3. Matrix visualization:
   - Use MathTex for display
   - Format: r'\begin{bmatrix} a & b \\ c & d \end{bmatrix}'
4. Use only verified Manim methods:
   - self.play(), self.wait(), Create(), Write(), Transform(), FadeIn(), FadeOut(), Add(), Remove(), MoveAlongPath(), Rotating(), Circumscribe(), Indicate(), FocusOn(), Shift(), Scale(), MoveTo(), NextTo(), Axes(), Plot(), LineGraph(), BarChart(), Dot(), Line(), Arrow(), Text(), Tex(), MathTex(), VGroup(), Mobject.animate, self.camera.frame.animate
5. DO NOT USE IMAGES IMPORTS.
6. Make the video crazy and innovative by:
   - Fading out text and other elements gracefully once they are no longer needed
   - Adding creative interactive elements like arrows, labels, and transitions
   - Incorporating graphs/plots (Axes, Plot, LineGraph, BarChart) where appropriate
   - Leveraging smooth transitions and varied pacing to keep the viewer engaged.
7. Ensure the video is error-free by:
   - Validating all objects before animations
   - Handling exceptions gracefully (in generated code if applicable)
   - Ensuring operands for vector operations match in shape to avoid broadcasting errors
8. Validate that every arrow creation ensures its start and end points are distinct to prevent normalization errors.
9. Use longer scenes (e.g., 5-6 seconds per major step) for complex transformations and shorter scenes for simple animations, with a total duration of exactly 30 seconds.
10. Align the narration script with the animation pace for seamless storytelling.
11. Ensure all objects in self.play() are valid animations (e.g., `Create(obj)`, `obj.animate.shift(UP)`).
12. Use Mobject.animate for animations involving Mobject methods.
13. CRITICAL: DO NOT USE BARCHATS, LINEGRAPHS, OR PLOTTING WITHOUT EXPLICIT INSTRUCTIONS.
14. Provide creative and sometimes crazy Manim video scripts that push the conventional boundaries.
15. **Synchronization:** Structure the narration and Manim code for better synchronization:
    - Keep narration segments concise and directly tied to the visual elements.
    - Use `self.wait(duration)` in the Manim code to match natural pauses in narration.
    - Adjust `run_time` in `self.play()` calls to match the speaking duration of the associated narration.
    - Ensure the animation and narration sum to exactly 30 seconds.
### MANIM CODE:
Provide only valid Python code using Manim Community v0.19.0 to generate the video animation.

### NARRATION:
Provide a concise narration script for the video that aligns with the Manim code's pacing and visuals.DO NOT give timestamps.

"#;

/// Replaces the delimiter instructions when the model is asked for JSON.
pub static STRUCTURED_OUTPUT_NOTE: &str = "Return a JSON object with exactly two string fields: \
\"manim_code\" (the complete Python source) and \"narration\" (the narration script).";

pub fn idea_prompt(idea: &str) -> String {
    format!(
        "Create a 30-second Manim video script about '{}'. {}",
        idea, BASE_INSTRUCTIONS
    )
}

pub fn pdf_prompt() -> String {
    format!(
        "Create a 30-second Manim video script summarizing the key points or illustrating a core concept from the provided PDF document. {}",
        BASE_INSTRUCTIONS
    )
}

pub fn fix_prompt(faulty_code: &str, error_message: &str, original_context: &str) -> String {
    format!(
        r#"
TASK: Fix the broken Manim code that failed with a specific error.

### ORIGINAL REQUEST:
{original_context}

### BROKEN MANIM CODE:
```python
{faulty_code}
```

### ERROR ENCOUNTERED:
```
{error_message}
```

### ANALYSIS INSTRUCTIONS:
1. **Error Analysis**: Examine the error message carefully. Common issues include:
   - Import errors (missing 'from manim import *' or 'import numpy as np')
   - Scene class not found (class must inherit from Scene)
   - Invalid Manim methods or syntax
   - Vector dimension mismatches (use np.array([x, y, 0]))
   - Animation object validation errors
   - Timing issues (ensure total duration = 30 seconds)

2. **Google Search**: Use Google Search to find:
   - Recent Manim Community v0.19.0 API changes
   - Specific error message solutions
   - Updated method signatures or deprecated features
   - Working examples of similar animations

3. **Code Fixing Strategy**:
   - Keep the original animation concept intact
   - Fix only what's necessary to resolve the error
   - Ensure all imports are present
   - Validate Scene class exists and is properly named
   - Use only verified Manim methods from the allowed list

4. **Quality Checks**:
   - Verify vector operations use 3D format: np.array([x, y, 0])
   - Check all self.play() calls have valid animation objects
   - Ensure run_time and self.wait() sum to the intended duration

### OUTPUT FORMAT:
Provide your response in exactly this format:

### MANIM CODE:
[Insert the complete, fixed Manim code here - include all imports and Scene class]

### NARRATION:
[Insert the narration script here, synchronized with animations]

### REQUIREMENTS TO FOLLOW:
{BASE_INSTRUCTIONS}
"#
    )
}

pub fn examples_preamble(guide: &str) -> String {
    format!(
        "Below are examples of Manim code that demonstrate proper usage patterns. Use these as reference when generating your animation:\n\n{}",
        guide
    )
}

/// Read the Manim examples guide. A missing or empty guide yields `None`.
pub async fn load_guide(path: &Path) -> Option<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(guide) if !guide.trim().is_empty() => {
            info!(path = %path.display(), "Loaded Manim examples guide");
            Some(guide)
        }
        Ok(_) => {
            warn!(path = %path.display(), "Manim examples guide is empty");
            None
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Manim examples guide not found");
            None
        }
    }
}
